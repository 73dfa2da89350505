//! HTTP 服务的启动与共享状态

use axum::{extract::Request, middleware::Next, response::Response, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::routes;
use crate::config::RuntimeConfig;
use crate::notification::WebhookDispatcher;

/// 对外只暴露“是否已配置”，不暴露地址本身
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceInfo {
    pub webhook_configured: bool,
    pub monitoring_configured: bool,
    pub hub_configured: bool,
}

/// handler 共享的状态
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeConfig>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub info: ServiceInfo,
}

impl AppState {
    pub fn new(
        runtime: Arc<RuntimeConfig>,
        dispatcher: Arc<WebhookDispatcher>,
        hub_configured: bool,
    ) -> Self {
        let info = ServiceInfo {
            webhook_configured: dispatcher.webhook_configured(),
            monitoring_configured: dispatcher.monitoring_configured(),
            hub_configured,
        };
        Self {
            runtime,
            dispatcher,
            info,
        }
    }
}

/// 管理服务
pub struct AdminServer {
    port: u16,
    state: AppState,
}

impl AdminServer {
    pub fn new(port: u16, state: AppState) -> Self {
        Self { port, state }
    }

    /// 带请求日志中间件的完整路由
    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(axum::middleware::from_fn(log_request))
    }

    /// 监听并服务，直到出错
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let router = self.router();
        let listener = TcpListener::bind(addr).await?;

        info!(address = %addr, "starting HTTP server");
        axum::serve(listener, router).await?;
        Ok(())
    }

    /// 作为独立任务运行，不阻塞事件循环
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                error!(error = %e, "failed to start HTTP server");
            }
        })
    }
}

async fn log_request(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    info!(
        status = response.status().as_u16(),
        method = %method,
        path = %path,
        latency_ms = start.elapsed().as_millis() as u64,
        "HTTP request"
    );
    response
}
