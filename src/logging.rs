//! 日志初始化 - JSON 输出到 stdout，级别可在运行时切换

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    reload::{self, Handle},
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

use crate::config::LogLevel;

/// 可重载的级别过滤器句柄
pub type FilterHandle = Handle<EnvFilter, Registry>;

/// 本 crate 按所选级别输出，依赖库（hyper、reqwest 等）最多到 warn
pub fn filter_for(level: LogLevel) -> EnvFilter {
    let deps = match level {
        LogLevel::Error => "error",
        _ => "warn",
    };
    EnvFilter::new(format!("{deps},help_request_relay={level}"))
}

/// 安装全局 subscriber，返回用于运行时调整级别的句柄
pub fn init_logging(initial: LogLevel) -> anyhow::Result<FilterHandle> {
    let (filter_layer, handle) = reload::Layer::new(filter_for(initial));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set global default subscriber: {}", e))?;

    Ok(handle)
}
