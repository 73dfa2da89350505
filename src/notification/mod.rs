//! 通知层 - 卡片格式化与 webhook 发送
//!
//! ```ignore
//! use help_request_relay::notification::{WebhookConfig, WebhookDispatcher};
//!
//! let dispatcher = WebhookDispatcher::new(WebhookConfig {
//!     webhook_url: Some("https://example.webhook.office.com/...".into()),
//!     ..Default::default()
//! })?;
//! dispatcher.notify("ITB-1010-CP1").await?;
//! ```

pub mod error;
pub mod formatter;
pub mod webhook;

pub use error::NotifyError;
pub use formatter::{format, CardFact, CardSection, MessageCard, NotificationRequest};
pub use webhook::{DispatchOutcome, WebhookConfig, WebhookDispatcher};
