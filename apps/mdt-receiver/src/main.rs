//! 遥测拨出接收器：按配置监听 TCP 或 gRPC 拨出，指标写入日志。

mod sink;

use mdt_config::ReceiverConfig;
use mdt_ingest::Receiver;
use mdt_telemetry::{init_tracing, metrics};
use sink::LogSink;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量（及 MDT_CONFIG_FILE）加载运行配置
    let config = ReceiverConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let receiver = Receiver::start(&config, Arc::new(LogSink)).await?;
    info!(
        target: "mdt.receiver",
        transport = %receiver.transport(),
        addr = %receiver.local_addr(),
        "receiver_ready"
    );

    tokio::signal::ctrl_c().await?;
    info!(target: "mdt.receiver", "shutdown_requested");
    receiver.stop().await;

    let snapshot = metrics().snapshot();
    info!(
        target: "mdt.receiver",
        connections = snapshot.connections_accepted,
        streams = snapshot.streams_accepted,
        messages = snapshot.messages_received,
        metrics = snapshot.metrics_emitted,
        decode_failures = snapshot.decode_failures,
        row_failures = snapshot.row_failures,
        "receiver_stopped"
    );
    Ok(())
}
