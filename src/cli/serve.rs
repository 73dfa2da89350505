// src/cli/serve.rs
//! 主流程 - 启动管理 HTTP 服务并消费事件中心的求助事件
//!
//! 1. 初始化日志与运行时配置
//! 2. 管理 HTTP 服务作为独立任务启动
//! 3. 连接事件中心，订阅全部房间，逐个处理事件

use anyhow::Result;
use clap::Args;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::{AdminServer, AppState};
use crate::config::{non_empty, LogLevel, RuntimeConfig, Settings};
use crate::hub::{EventListener, EventSource, HubError, HubMessenger, ALL_ROOMS};
use crate::logging::init_logging;
use crate::notification::{WebhookConfig, WebhookDispatcher};

/// 运行参数（flag 优先于环境变量）
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// 日志级别: debug, info, warn, error
    #[arg(long, short = 'L', env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// 事件中心地址
    #[arg(long, env = "EVENT_HUB_ADDRESS")]
    pub hub_address: Option<String>,

    /// 接收消息卡片的 webhook 地址
    #[arg(long, env = "TEAMS_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// 监控服务根地址
    #[arg(long = "monitoring-url", env = "TEAMS_MONITORING_URL")]
    pub monitoring_url: Option<String>,

    /// HTTP 服务端口
    #[arg(long, short = 'P', env = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl ServeArgs {
    pub fn into_settings(self) -> Settings {
        Settings {
            log_level: non_empty(self.log_level),
            hub_address: non_empty(self.hub_address),
            webhook_url: non_empty(self.webhook_url),
            monitoring_url: non_empty(self.monitoring_url),
            port: self.port,
        }
    }
}

/// 事件中心的启动结果
pub enum HubStartup<S> {
    /// 已连接并订阅全部房间
    Ready(S),
    /// 调试模式下忽略失败，只保留 HTTP 服务
    Degraded,
    /// 非调试模式下失败，进程退出
    Fatal,
}

/// 连接事件中心并订阅全部房间
///
/// 连接和订阅失败走同一个策略：`permissive` 时降级，否则致命。
pub async fn open_event_source<S, F, Fut>(connect: F, permissive: bool) -> HubStartup<S>
where
    S: EventSource,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<S, HubError>>,
{
    let (stage, e) = match connect().await {
        Ok(mut source) => match source.subscribe(ALL_ROOMS).await {
            Ok(()) => return HubStartup::Ready(source),
            Err(e) => ("failed to subscribe to room events", e),
        },
        Err(e) => ("failed to build event hub messenger", e),
    };

    if permissive {
        warn!(error = %e, "{} - continuing in debug mode without event subscription", stage);
        HubStartup::Degraded
    } else {
        error!(error = %e, "{} - exiting", stage);
        HubStartup::Fatal
    }
}

/// 处理主命令
pub async fn handle_serve(args: ServeArgs) -> Result<()> {
    let settings = args.into_settings();

    let filter_handle = init_logging(LogLevel::Info)?;
    let runtime = Arc::new(RuntimeConfig::with_reload_handle(LogLevel::Info, filter_handle));

    let level_name = settings.effective_log_level();
    if settings.log_level.is_none() && cfg!(windows) {
        info!("running from Windows, logging set to debug");
    }
    if let Err(e) = runtime.set(level_name) {
        error!(error = %e, "cannot set log level");
    }

    info!(
        log_level = %level_name,
        hub_address_set = settings.hub_address.is_some(),
        webhook_url_set = settings.webhook_url.is_some(),
        monitoring_url_set = settings.monitoring_url.is_some(),
        port = settings.port,
        "starting service with configuration"
    );

    if settings.webhook_url.is_none() {
        error!(
            usage = "Set TEAMS_WEBHOOK_URL environment variable or use --webhook-url flag",
            "webhook URL not provided - notifications will not be sent"
        );
    }
    if settings.hub_address.is_none() {
        error!(
            usage = "Set EVENT_HUB_ADDRESS environment variable or use --hub-address flag",
            "hub address not provided - event subscription will fail"
        );
    }

    let dispatcher = Arc::new(WebhookDispatcher::new(WebhookConfig {
        webhook_url: settings.webhook_url.clone(),
        monitoring_url: settings.monitoring_url.clone(),
        ..Default::default()
    })?);

    let state = AppState::new(
        Arc::clone(&runtime),
        Arc::clone(&dispatcher),
        settings.hub_address.is_some(),
    );
    let server = AdminServer::new(settings.port, state).spawn();

    // 是否宽容连接失败，以启动完成时的级别为准
    let permissive = runtime.is_debug();

    info!("starting event hub messenger");
    let hub_address = settings.hub_address.clone();
    let connect = || async move { HubMessenger::connect(hub_address.as_deref()).await };

    let mut messenger = match open_event_source(connect, permissive).await {
        HubStartup::Ready(messenger) => messenger,
        HubStartup::Degraded => {
            info!("running in debug mode without event subscription - HTTP endpoints will remain available");
            if let Err(e) = server.await {
                error!(error = %e, "HTTP server task ended unexpectedly");
            }
            return Ok(());
        }
        HubStartup::Fatal => return Ok(()),
    };

    let stats = EventListener::new(dispatcher).run(&mut messenger).await;
    error!(
        received = stats.received,
        sent = stats.sent,
        failed = stats.failed,
        "event hub unreachable after reconnect attempts - exiting"
    );

    Ok(())
}
