//! Help Request Relay - 将房间求助告警从事件中心转发到 webhook

pub mod api;
pub mod cli;
pub mod config;
pub mod hub;
pub mod logging;
pub mod notification;

pub use api::{AdminServer, AppState};
pub use config::{ConfigError, LogLevel, RuntimeConfig, Settings};
pub use hub::{is_help_request, Event, EventListener, EventSource, HubError, HubMessenger, ListenerStats};
pub use notification::{DispatchOutcome, MessageCard, NotifyError, WebhookConfig, WebhookDispatcher};
