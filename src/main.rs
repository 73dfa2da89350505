//! Help Request Relay
//!
//! 订阅事件中心的房间事件，把已确认的求助告警转发为 webhook 消息卡片，
//! 同时提供健康检查、日志级别调整与手动触发的 HTTP 接口。

use anyhow::Result;
use clap::Parser;
use help_request_relay::cli::{handle_serve, ServeArgs};

#[derive(Parser)]
#[command(name = "help-request-relay")]
#[command(about = "Relay room help-request alerts from the event hub to a chat webhook")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    handle_serve(cli.serve).await
}
