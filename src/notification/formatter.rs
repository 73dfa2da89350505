//! 消息卡片格式化 - 将 generating system 转换为 webhook 卡片
//!
//! generating system 形如 `ITB-1010-CP1`，拆分为 building / room / device，
//! 生成只含一个 section、四个 fact 的 MessageCard。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::NotifyError;

pub const THEME_COLOR: &str = "0076D7";
pub const CARD_CONTEXT: &str = "http://schema.org/extensions";
pub const CARD_TYPE: &str = "MessageCard";
pub const CARD_TITLE: &str = "Help Request Bot";
pub const MONITORING_LINK_NAME: &str = "View Room in Monitoring";

/// RFC1123 (GMT)，例如 `Mon, 02 Jan 2006 15:04:05 GMT`
const RFC1123: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// 一次求助请求的来源位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub building: String,
    pub room: String,
    pub device: String,
}

impl NotificationRequest {
    /// 解析 `building-room-device`
    ///
    /// 少于三段或前三段中有空段时返回 `MalformedIdentifier`；
    /// 多于三段时只取前三段，其余丢弃并打 warn 日志。
    pub fn parse(generating_system: &str) -> Result<Self, NotifyError> {
        let tokens: Vec<&str> = generating_system.split('-').collect();
        if tokens.len() < 3 || tokens[..3].iter().any(|t| t.is_empty()) {
            return Err(NotifyError::MalformedIdentifier(generating_system.to_string()));
        }

        if tokens.len() > 3 {
            warn!(
                generating_system = %generating_system,
                discarded = %tokens[3..].join("-"),
                "generating system has more than three segments, extra segments ignored"
            );
        }

        Ok(Self {
            building: tokens[0].to_string(),
            room: tokens[1].to_string(),
            device: tokens[2].to_string(),
        })
    }

    /// `building-room`
    pub fn room_id(&self) -> String {
        format!("{}-{}", self.building, self.room)
    }

    /// 监控服务中该房间的页面
    pub fn monitoring_link(&self, monitoring_url: &str) -> String {
        format!("{}/rooms/{}", monitoring_url.trim_end_matches('/'), self.room_id())
    }
}

/// Webhook 消息卡片
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCard {
    #[serde(rename = "themeColor")]
    pub theme_color: String,
    #[serde(rename = "@context")]
    pub context: String,
    pub sections: Vec<CardSection>,
    pub summary: String,
    #[serde(rename = "@type")]
    pub card_type: String,
    #[serde(
        rename = "potentialAction",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub potential_actions: Vec<PotentialAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSection {
    #[serde(rename = "activityTitle")]
    pub activity_title: String,
    #[serde(rename = "activitySubtitle")]
    pub activity_subtitle: String,
    pub facts: Vec<CardFact>,
    pub markdown: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardFact {
    pub name: String,
    pub value: String,
}

impl CardFact {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// OpenUri 动作（跳转到监控页面）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialAction {
    #[serde(rename = "@type")]
    pub action_type: String,
    pub name: String,
    pub targets: Vec<ActionTarget>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTarget {
    pub os: String,
    pub uri: String,
}

impl MessageCard {
    /// 按已解析的请求生成卡片
    pub fn for_request(request: &NotificationRequest, captured_at: DateTime<Utc>) -> Self {
        Self {
            theme_color: THEME_COLOR.to_string(),
            context: CARD_CONTEXT.to_string(),
            summary: CARD_TITLE.to_string(),
            card_type: CARD_TYPE.to_string(),
            sections: vec![CardSection {
                activity_title: CARD_TITLE.to_string(),
                activity_subtitle: format!("Help Request for {}", request.room_id()),
                facts: vec![
                    CardFact::new("Building", request.building.as_str()),
                    CardFact::new("Room", request.room.as_str()),
                    CardFact::new("Device", request.device.as_str()),
                    CardFact::new("Time Stamp", captured_at.format(RFC1123).to_string()),
                ],
                markdown: true,
            }],
            potential_actions: Vec::new(),
        }
    }

    /// 附加 "View Room in Monitoring" 链接
    pub fn with_monitoring_link(mut self, uri: impl Into<String>) -> Self {
        self.potential_actions.push(PotentialAction {
            action_type: "OpenUri".to_string(),
            name: MONITORING_LINK_NAME.to_string(),
            targets: vec![ActionTarget {
                os: "default".to_string(),
                uri: uri.into(),
            }],
        });
        self
    }

    /// 取某个 fact 的值
    pub fn fact(&self, name: &str) -> Option<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.facts.iter())
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    /// 监控跳转链接（如果有）
    pub fn monitoring_link(&self) -> Option<&str> {
        self.potential_actions
            .iter()
            .find(|a| a.name == MONITORING_LINK_NAME)
            .and_then(|a| a.targets.first())
            .map(|t| t.uri.as_str())
    }
}

/// generating system + 捕获时间 → MessageCard
pub fn format(generating_system: &str, captured_at: DateTime<Utc>) -> Result<MessageCard, NotifyError> {
    let request = NotificationRequest::parse(generating_system)?;
    Ok(MessageCard::for_request(&request, captured_at))
}
