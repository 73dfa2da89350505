//! 通知发送错误类型

use thiserror::Error;

/// 通知格式化 / 发送过程中的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// generating system 不是 `building-room-device` 形式
    #[error("malformed identifier '{0}': expected <building>-<room>-<device>")]
    MalformedIdentifier(String),

    #[error("webhook URL is not configured")]
    MissingWebhookUrl,

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("failed to serialize message card: {0}")]
    Serialize(String),

    /// DNS、连接拒绝、超时等传输层失败
    #[error("error sending request to webhook: {0}")]
    Transport(String),

    #[error("received non-success status code {0} from webhook")]
    Status(u16),
}

impl NotifyError {
    /// 对应的 HTTP 状态码（仅 `Status` 有）
    pub fn http_status(&self) -> Option<u16> {
        match self {
            NotifyError::Status(code) => Some(*code),
            _ => None,
        }
    }
}
