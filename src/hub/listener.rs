//! 事件消费循环
//!
//! 逐个拉取事件，命中求助告警时同步发送 webhook；
//! 发送失败只记录日志，循环继续。事件源关闭时循环结束。

use std::sync::Arc;
use tracing::{debug, error, info};

use super::{is_help_request, Event, EventSource};
use crate::notification::WebhookDispatcher;

/// 循环统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub received: u64,
    pub matched: u64,
    pub sent: u64,
    pub failed: u64,
}

/// 事件消费者
pub struct EventListener {
    dispatcher: Arc<WebhookDispatcher>,
    stats: ListenerStats,
}

impl EventListener {
    pub fn new(dispatcher: Arc<WebhookDispatcher>) -> Self {
        Self {
            dispatcher,
            stats: ListenerStats::default(),
        }
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    /// 运行直到事件源关闭
    pub async fn run<S: EventSource + ?Sized>(&mut self, source: &mut S) -> ListenerStats {
        info!("listening for room events");

        while let Some(event) = source.next_event().await {
            self.handle_event(&event).await;
        }

        info!(
            received = self.stats.received,
            matched = self.stats.matched,
            sent = self.stats.sent,
            failed = self.stats.failed,
            "event source closed"
        );
        self.stats
    }

    /// 处理单个事件，返回是否命中过滤条件
    pub async fn handle_event(&mut self, event: &Event) -> bool {
        self.stats.received += 1;
        if !is_help_request(event) {
            return false;
        }

        self.stats.matched += 1;
        debug!(
            key = %event.key,
            value = %event.value,
            generating_system = %event.generating_system,
            "help request detected"
        );

        match self.dispatcher.notify(&event.generating_system).await {
            Ok(()) => self.stats.sent += 1,
            Err(e) => {
                self.stats.failed += 1;
                error!(
                    error = %e,
                    generating_system = %event.generating_system,
                    "failed to send webhook message"
                );
            }
        }

        true
    }
}
