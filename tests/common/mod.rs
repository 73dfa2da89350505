//! 测试公共工具：本地 mock webhook

#![allow(dead_code)]

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use help_request_relay::{WebhookConfig, WebhookDispatcher};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    cards: Arc<Mutex<Vec<serde_json::Value>>>,
    content_types: Arc<Mutex<Vec<String>>>,
}

/// 本地 webhook，记录收到的卡片并返回固定状态码
pub struct MockWebhook {
    pub url: String,
    cards: Arc<Mutex<Vec<serde_json::Value>>>,
    content_types: Arc<Mutex<Vec<String>>>,
}

impl MockWebhook {
    pub async fn start(status: StatusCode) -> Self {
        let cards = Arc::new(Mutex::new(Vec::new()));
        let content_types = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            cards: cards.clone(),
            content_types: content_types.clone(),
        };

        let app = Router::new()
            .route("/webhook", post(record))
            .with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}/webhook", addr),
            cards,
            content_types,
        }
    }

    pub fn cards(&self) -> Vec<serde_json::Value> {
        self.cards.lock().unwrap().clone()
    }

    pub fn content_types(&self) -> Vec<String> {
        self.content_types.lock().unwrap().clone()
    }
}

async fn record(State(state): State<MockState>, headers: HeaderMap, body: String) -> StatusCode {
    if let Some(ct) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
        state.content_types.lock().unwrap().push(ct.to_string());
    }
    state
        .cards
        .lock()
        .unwrap()
        .push(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null));
    state.status
}

/// 一个当前没有监听者的地址（连接会被拒绝）
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/webhook", addr)
}

pub fn dispatcher_for(webhook_url: Option<String>, monitoring_url: Option<String>) -> Arc<WebhookDispatcher> {
    Arc::new(
        WebhookDispatcher::new(WebhookConfig {
            webhook_url,
            monitoring_url,
            ..Default::default()
        })
        .unwrap(),
    )
}

/// 卡片中的 fact 列表 (name, value)
pub fn facts(card: &serde_json::Value) -> Vec<(String, String)> {
    card["sections"][0]["facts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| {
            (
                f["name"].as_str().unwrap().to_string(),
                f["value"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}
