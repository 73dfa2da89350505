//! 管理 / 手动触发 HTTP 服务

pub mod routes;
pub mod server;

pub use server::{AdminServer, AppState, ServiceInfo};
