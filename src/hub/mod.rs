//! 事件中心 - 房间事件的订阅、过滤与消费
//!
//! 事件源抽象为 `EventSource`（订阅一次，然后逐个拉取事件），
//! `HubMessenger` 是基于 websocket 的实现，`EventListener` 是消费循环。

pub mod listener;
pub mod messenger;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use listener::{EventListener, ListenerStats};
pub use messenger::{HubError, HubMessenger, ReconnectPolicy};

/// 订阅全部房间
pub const ALL_ROOMS: &str = "*";

pub const HELP_REQUEST_KEY: &str = "help-request";
pub const CONFIRM_VALUE: &str = "confirm";
pub const ALERT_TAG: &str = "alert";

/// 事件中心推送的房间事件（只保留需要的字段）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "event-tags", default)]
    pub event_tags: Vec<String>,
    /// `<building>-<room>-<device>`
    #[serde(rename = "generating-system", default)]
    pub generating_system: String,
}

impl Event {
    pub fn new(key: &str, value: &str, tags: &[&str], generating_system: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            event_tags: tags.iter().map(|t| t.to_string()).collect(),
            generating_system: generating_system.to_string(),
        }
    }
}

/// 是否为已确认的求助告警
pub fn is_help_request(event: &Event) -> bool {
    event.key == HELP_REQUEST_KEY
        && event.value == CONFIRM_VALUE
        && event.event_tags.iter().any(|t| t == ALERT_TAG)
}

/// 事件源
#[async_trait]
pub trait EventSource: Send {
    /// 订阅主题（`*` 表示所有房间）
    async fn subscribe(&mut self, topic: &str) -> Result<(), HubError>;

    /// 等待下一个事件；事件源关闭时返回 None
    async fn next_event(&mut self) -> Option<Event>;
}
