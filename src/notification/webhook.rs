//! Webhook 客户端模块
//!
//! 将 MessageCard POST 到固定的 webhook 地址，单次尝试、不重试。

use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

use super::error::NotifyError;
use super::formatter::{MessageCard, NotificationRequest};

/// 单次请求超时
pub const WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// Webhook 客户端配置
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// 接收卡片的 webhook 地址
    pub webhook_url: Option<String>,
    /// 监控服务根地址（用于卡片里的跳转链接）
    pub monitoring_url: Option<String>,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            monitoring_url: None,
            timeout_secs: WEBHOOK_TIMEOUT_SECS,
        }
    }
}

/// 一次发送的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    /// 传输层失败时没有状态码
    pub http_status: Option<u16>,
    pub error: Option<NotifyError>,
}

impl DispatchOutcome {
    fn sent(status: u16) -> Self {
        Self {
            success: true,
            http_status: Some(status),
            error: None,
        }
    }

    fn failed(err: NotifyError) -> Self {
        Self {
            success: false,
            http_status: err.http_status(),
            error: Some(err),
        }
    }

    /// 成功时返回状态码，失败时返回原始错误
    pub fn into_result(self) -> Result<u16, NotifyError> {
        match (self.success, self.error) {
            (true, _) => Ok(self.http_status.unwrap_or_default()),
            (false, Some(err)) => Err(err),
            (false, None) => Err(NotifyError::Transport("dispatch failed".to_string())),
        }
    }
}

/// Webhook 分发器
///
/// 内部的 `reqwest::Client` 无可变状态，可在事件循环和 HTTP handler 之间共享。
#[derive(Debug)]
pub struct WebhookDispatcher {
    client: Client,
    config: WebhookConfig,
}

impl WebhookDispatcher {
    /// 创建新的分发器
    pub fn new(config: WebhookConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn webhook_configured(&self) -> bool {
        self.config.webhook_url.is_some()
    }

    pub fn monitoring_configured(&self) -> bool {
        self.config.monitoring_url.is_some()
    }

    /// 发送卡片，返回结果（不会 panic，也不会重试）
    pub async fn dispatch(&self, card: &MessageCard) -> DispatchOutcome {
        match self.post_card(card).await {
            Ok(status) => {
                info!(
                    status,
                    building = card.fact("Building").unwrap_or(""),
                    room = card.fact("Room").unwrap_or(""),
                    monitoring_url = card.monitoring_link().unwrap_or(""),
                    "successfully sent webhook notification"
                );
                DispatchOutcome::sent(status)
            }
            Err(e) => DispatchOutcome::failed(e),
        }
    }

    /// 解析 generating system、生成卡片并发送
    ///
    /// 格式错误时不会发出任何 HTTP 请求。
    pub async fn notify(&self, generating_system: &str) -> Result<(), NotifyError> {
        let request = NotificationRequest::parse(generating_system)?;
        let mut card = MessageCard::for_request(&request, Utc::now());

        if let Some(base) = self.config.monitoring_url.as_deref() {
            card = card.with_monitoring_link(request.monitoring_link(base));
        }

        self.dispatch(&card).await.into_result().map(|_| ())
    }

    async fn post_card(&self, card: &MessageCard) -> Result<u16, NotifyError> {
        let url = self
            .config
            .webhook_url
            .as_deref()
            .ok_or(NotifyError::MissingWebhookUrl)?;

        let payload = serde_json::to_string(card).map_err(|e| {
            error!(error = %e, "error marshaling message card to JSON");
            NotifyError::Serialize(e.to_string())
        })?;

        debug!(json_payload = %payload, "sending message to webhook");

        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .build()
            .map_err(|e| {
                error!(error = %e, "error creating HTTP request");
                NotifyError::Transport(e.to_string())
            })?;

        debug!(
            method = %request.method(),
            url = %request.url(),
            headers = ?request.headers(),
            "outgoing HTTP request"
        );

        let response = self.client.execute(request).await.map_err(|e| {
            error!(error = %e, "error sending request to webhook");
            NotifyError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        match response.text().await {
            Ok(body) => debug!(status, headers = ?headers, body = %body, "incoming HTTP response"),
            Err(e) => debug!(status, error = %e, "failed to read webhook response body"),
        }

        if !(200..=299).contains(&status) {
            error!(status_code = status, "received non-success status code from webhook");
            return Err(NotifyError::Status(status));
        }

        Ok(status)
    }
}
