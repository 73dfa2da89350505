//! 路由与 handler
//!
//! | 方法 | 路径 | 说明 |
//! |---|---|---|
//! | GET | `/ping` | `{"message":"pong"}` |
//! | GET | `/healthz` | `healthy` |
//! | GET | `/log_level` | 当前日志级别 |
//! | GET | `/log_level/{level}` | 修改日志级别 |
//! | GET | `/status`, `/api/v1/health`, `/api/v1/config` | 运行状态（地址只报告是否已配置） |
//! | GET | `/api/v1/notify/building/{b}/room/{r}/device/{d}` | 手动触发 |
//! | GET | `/api/v1/notify?building=&room=&device=&room_id=` | 手动触发 |
//! | POST | `/api/v1/notify` | 手动触发（JSON，不检查 Content-Type） |

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::server::AppState;

const NOTIFY_SENT: &str = "Notification sent successfully";

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(api_health))
        .route("/config", get(api_config))
        .route(
            "/notify/building/{building}/room/{room}/device/{device}",
            get(notify_by_path),
        )
        .route("/notify", get(notify_by_query).post(notify_by_body));

    Router::new()
        .route("/ping", get(ping))
        .route("/healthz", get(healthz))
        .route("/log_level", get(get_log_level))
        .route("/log_level/{level}", get(set_log_level))
        .route("/status", get(status))
        .nest("/api/v1", api)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

async fn ping() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "pong" }))
}

async fn healthz() -> &'static str {
    "healthy"
}

async fn get_log_level(State(state): State<AppState>) -> String {
    state.runtime.get().to_string()
}

async fn set_log_level(State(state): State<AppState>, Path(level): Path<String>) -> Response {
    match state.runtime.set(&level) {
        Ok(current) => (StatusCode::OK, format!("Log level set to {}", current)).into_response(),
        Err(e) => {
            info!(requested = %level, error = %e, "rejected log level change");
            (
                StatusCode::BAD_REQUEST,
                format!(
                    "Invalid log level: {}. Valid options are debug, info, warn, error",
                    level
                ),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
    service: &'static str,
    webhook_url: bool,
    hub_address: bool,
    monitoring_url: bool,
    log_level: String,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        webhook_url: state.info.webhook_configured,
        hub_address: state.info.hub_configured,
        monitoring_url: state.info.monitoring_configured,
        log_level: state.runtime.get().to_string(),
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    webhook_url: bool,
    monitoring_url: bool,
    log_level: String,
}

async fn api_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        webhook_url: state.info.webhook_configured,
        monitoring_url: state.info.monitoring_configured,
        log_level: state.runtime.get().to_string(),
    })
}

#[derive(Debug, Serialize)]
struct ConfigResponse {
    webhook_url: bool,
    monitoring_url: bool,
    log_level: String,
}

async fn api_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        webhook_url: state.info.webhook_configured,
        monitoring_url: state.info.monitoring_configured,
        log_level: state.runtime.get().to_string(),
    })
}

/// 手动触发的成功响应
#[derive(Debug, Serialize)]
struct NotifyResponse {
    message: &'static str,
    room_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<String>,
}

/// 同步发送；失败时返回 500
async fn send_manual(state: &AppState, generating_system: &str, room_id: &str) -> Result<(), Response> {
    info!(
        generating_system = %generating_system,
        room_id = %room_id,
        "manual help request notification triggered"
    );

    state
        .dispatcher
        .notify(generating_system)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to send webhook message");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to send notification: {}", e),
            )
        })
}

async fn notify_located(
    state: &AppState,
    building: String,
    room: String,
    device: String,
    room_id: String,
) -> Response {
    let generating_system = format!("{}-{}-{}", building, room, device);
    if let Err(response) = send_manual(state, &generating_system, &room_id).await {
        return response;
    }

    Json(NotifyResponse {
        message: NOTIFY_SENT,
        room_id,
        building: Some(building),
        room: Some(room),
        device: Some(device),
    })
    .into_response()
}

async fn notify_by_path(
    State(state): State<AppState>,
    Path((building, room, device)): Path<(String, String, String)>,
) -> Response {
    let room_id = format!("{}-{}", building, room);
    notify_located(&state, building, room, device, room_id).await
}

#[derive(Debug, Default, Deserialize)]
struct NotifyQuery {
    building: Option<String>,
    room: Option<String>,
    device: Option<String>,
    room_id: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn notify_by_query(State(state): State<AppState>, Query(query): Query<NotifyQuery>) -> Response {
    let (Some(building), Some(room), Some(device)) = (
        present(query.building),
        present(query.room),
        present(query.device),
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing required parameters: building, room, and device are required",
        );
    };

    let room_id = present(query.room_id).unwrap_or_else(|| format!("{}-{}", building, room));
    notify_located(&state, building, room, device, room_id).await
}

#[derive(Debug, Deserialize)]
struct NotifyBody {
    building: String,
    room: String,
    device: String,
    room_id: String,
}

impl NotifyBody {
    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("building", &self.building),
            ("room", &self.room),
            ("device", &self.device),
            ("room_id", &self.room_id),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

async fn notify_by_body(State(state): State<AppState>, payload: Bytes) -> Response {
    let body: NotifyBody = match serde_json::from_slice(&payload) {
        Ok(body) => body,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid request format: {}", e),
            )
        }
    };

    let missing = body.missing_fields();
    if !missing.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid request format: empty fields: {}", missing.join(", ")),
        );
    }

    // room_id 原样回显，不与 building-room 校验
    let generating_system = format!("{}-{}-{}", body.building, body.room, body.device);
    if let Err(response) = send_manual(&state, &generating_system, &body.room_id).await {
        return response;
    }

    Json(NotifyResponse {
        message: NOTIFY_SENT,
        room_id: body.room_id,
        building: None,
        room: None,
        device: None,
    })
    .into_response()
}
