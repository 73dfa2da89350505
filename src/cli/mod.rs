//! CLI command handling

pub mod serve;

pub use serve::*;
