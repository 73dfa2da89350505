//! 运行配置
//!
//! - `Settings`: 启动时已解析好的扁平配置（flag > 环境变量 > 默认值）
//! - `RuntimeConfig`: 进程内唯一的可变状态（日志级别），由一把互斥锁保护

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::info;

use crate::logging::{filter_for, FilterHandle};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown log level: {0}")]
    InvalidLevel(String),

    #[error("failed to reload log filter: {0}")]
    Reload(String),
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    /// 大小写不敏感，`warning` 等同于 `warn`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

/// 启动配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// 未显式指定时为 None
    pub log_level: Option<String>,
    pub hub_address: Option<String>,
    pub webhook_url: Option<String>,
    pub monitoring_url: Option<String>,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: None,
            hub_address: None,
            webhook_url: None,
            monitoring_url: None,
            port: 8080,
        }
    }
}

impl Settings {
    /// 启动时要应用的日志级别名
    ///
    /// 未指定时默认 info；Windows 下默认 debug（开发环境）。
    pub fn effective_log_level(&self) -> &str {
        match self.log_level.as_deref() {
            Some(level) => level,
            None if cfg!(windows) => "debug",
            None => "info",
        }
    }
}

/// 空字符串视为未设置
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

struct LevelState {
    level: LogLevel,
    reload: Option<FilterHandle>,
}

/// 运行时日志级别存储
///
/// 读写都在同一把锁内完成；有 reload 句柄时，级别切换与过滤器重载一起生效。
pub struct RuntimeConfig {
    state: Mutex<LevelState>,
}

impl RuntimeConfig {
    /// 不绑定全局 subscriber（测试用）
    pub fn new(level: LogLevel) -> Self {
        Self {
            state: Mutex::new(LevelState { level, reload: None }),
        }
    }

    pub fn with_reload_handle(level: LogLevel, handle: FilterHandle) -> Self {
        Self {
            state: Mutex::new(LevelState {
                level,
                reload: Some(handle),
            }),
        }
    }

    /// 当前级别
    pub fn get(&self) -> LogLevel {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .level
    }

    pub fn is_debug(&self) -> bool {
        self.get() == LogLevel::Debug
    }

    /// 按名称设置级别，名称无效时保持原值
    pub fn set(&self, name: &str) -> Result<LogLevel, ConfigError> {
        let level: LogLevel = name.parse()?;
        self.set_level(level)?;
        Ok(level)
    }

    pub fn set_level(&self, level: LogLevel) -> Result<(), ConfigError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = &state.reload {
                handle
                    .reload(filter_for(level))
                    .map_err(|e| ConfigError::Reload(e.to_string()))?;
            }
            state.level = level;
        }

        info!(level = %level, "log level updated");
        Ok(())
    }
}

impl fmt::Debug for RuntimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfig")
            .field("level", &self.get())
            .finish()
    }
}
