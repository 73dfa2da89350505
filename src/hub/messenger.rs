//! 事件中心 websocket 客户端

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use super::{Event, EventSource};

/// 建立连接的超时
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 断线后两次重连之间的间隔
pub const RECONNECT_DELAY_SECS: u64 = 5;

/// 断线重连策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// 一次断线内最多尝试次数，None 表示一直重试
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(RECONNECT_DELAY_SECS),
            max_attempts: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("event hub address is not configured")]
    MissingAddress,

    #[error("failed to connect to event hub at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("timed out connecting to event hub at {0}")]
    Timeout(String),

    #[error("failed to encode subscription: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to send to event hub: {0}")]
    Send(#[source] tokio_tungstenite::tungstenite::Error),
}

/// 订阅变更消息
#[derive(Debug, Serialize)]
struct SubscriptionChange<'a> {
    rooms: Vec<&'a str>,
    create: bool,
}

type HubStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 基于 websocket 的事件源
///
/// 连接断开后按 `ReconnectPolicy` 重连并重新订阅上次的主题。
pub struct HubMessenger {
    url: String,
    stream: HubStream,
    topic: Option<String>,
    reconnect: ReconnectPolicy,
}

impl HubMessenger {
    /// `host:port` → `ws://host:port/connect/messenger`，带 scheme 的地址原样使用
    pub fn messenger_url(address: &str) -> String {
        if address.contains("://") {
            address.to_string()
        } else {
            format!("ws://{}/connect/messenger", address.trim_end_matches('/'))
        }
    }

    /// 连接事件中心
    pub async fn connect(address: Option<&str>) -> Result<Self, HubError> {
        let address = address
            .filter(|a| !a.is_empty())
            .ok_or(HubError::MissingAddress)?;
        let url = Self::messenger_url(address);
        let stream = Self::open(&url).await?;

        Ok(Self {
            url,
            stream,
            topic: None,
            reconnect: ReconnectPolicy::default(),
        })
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn open(url: &str) -> Result<HubStream, HubError> {
        info!(url = %url, "connecting to event hub");
        let (stream, _response) =
            tokio::time::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), connect_async(url))
                .await
                .map_err(|_| HubError::Timeout(url.to_string()))?
                .map_err(|source| HubError::Connect {
                    url: url.to_string(),
                    source,
                })?;
        Ok(stream)
    }

    async fn send_subscription(&mut self, topic: &str) -> Result<(), HubError> {
        let change = SubscriptionChange {
            rooms: vec![topic],
            create: true,
        };
        let text = serde_json::to_string(&change)?;
        self.stream
            .send(Message::text(text))
            .await
            .map_err(HubError::Send)
    }

    /// 重连并重新订阅；策略允许的次数用尽时返回 false
    async fn reconnect(&mut self) -> bool {
        let mut attempt: u32 = 0;
        loop {
            if self.reconnect.max_attempts.is_some_and(|max| attempt >= max) {
                error!(url = %self.url, attempts = attempt, "giving up reconnecting to event hub");
                return false;
            }
            attempt += 1;
            tokio::time::sleep(self.reconnect.delay).await;

            let stream = match Self::open(&self.url).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, attempt, "event hub reconnect failed");
                    continue;
                }
            };
            self.stream = stream;

            if let Some(topic) = self.topic.clone() {
                if let Err(e) = self.send_subscription(&topic).await {
                    warn!(error = %e, attempt, "event hub resubscribe failed");
                    continue;
                }
            }

            info!(url = %self.url, attempt, "reconnected to event hub");
            return true;
        }
    }

    /// 从当前连接读取下一个事件；连接断开时返回 None
    async fn read_event(&mut self) -> Option<Event> {
        while let Some(message) = self.stream.next().await {
            let message = match message {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "event hub connection error");
                    return None;
                }
            };

            let event = match message {
                Message::Text(text) => Self::decode(text.as_bytes()),
                Message::Binary(data) => Self::decode(&data),
                Message::Close(frame) => {
                    info!(frame = ?frame, "event hub closed the connection");
                    return None;
                }
                _ => None,
            };

            if event.is_some() {
                return event;
            }
        }

        warn!("event hub stream ended");
        None
    }

    fn decode(bytes: &[u8]) -> Option<Event> {
        match serde_json::from_slice::<Event>(bytes) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(error = %e, "skipping undecodable hub message");
                None
            }
        }
    }
}

#[async_trait]
impl EventSource for HubMessenger {
    async fn subscribe(&mut self, topic: &str) -> Result<(), HubError> {
        self.send_subscription(topic).await?;
        self.topic = Some(topic.to_string());

        info!(topic = %topic, "subscribed to room events");
        Ok(())
    }

    async fn next_event(&mut self) -> Option<Event> {
        loop {
            if let Some(event) = self.read_event().await {
                return Some(event);
            }
            if !self.reconnect().await {
                return None;
            }
        }
    }
}
