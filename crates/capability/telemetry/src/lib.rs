//! 追踪初始化、连接 ID 生成与接收器计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 接收器计数器快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_accepted: u64,
    pub streams_accepted: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    pub decode_failures: u64,
    pub row_failures: u64,
    pub metrics_emitted: u64,
    pub framing_violations: u64,
    pub remote_faults: u64,
}

/// 接收器计数器。
pub struct TelemetryMetrics {
    connections_accepted: AtomicU64,
    streams_accepted: AtomicU64,
    messages_received: AtomicU64,
    bytes_received: AtomicU64,
    decode_failures: AtomicU64,
    row_failures: AtomicU64,
    metrics_emitted: AtomicU64,
    framing_violations: AtomicU64,
    remote_faults: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            connections_accepted: AtomicU64::new(0),
            streams_accepted: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            row_failures: AtomicU64::new(0),
            metrics_emitted: AtomicU64::new(0),
            framing_violations: AtomicU64::new(0),
            remote_faults: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            streams_accepted: self.streams_accepted.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            row_failures: self.row_failures.load(Ordering::Relaxed),
            metrics_emitted: self.metrics_emitted.load(Ordering::Relaxed),
            framing_violations: self.framing_violations.load(Ordering::Relaxed),
            remote_faults: self.remote_faults.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的连接/流 ID，用于 span 关联。
pub fn new_connection_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录 TCP 连接接入次数。
pub fn record_connection_accepted() {
    metrics().connections_accepted.fetch_add(1, Ordering::Relaxed);
}

/// 记录 gRPC 流接入次数。
pub fn record_stream_accepted() {
    metrics().streams_accepted.fetch_add(1, Ordering::Relaxed);
}

/// 记录收到的消息（含字节数）。
pub fn record_message_received(bytes: usize) {
    let metrics = metrics();
    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
    metrics
        .bytes_received
        .fetch_add(bytes as u64, Ordering::Relaxed);
}

/// 记录解码失败次数。
pub fn record_decode_failure() {
    metrics().decode_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录行扁平化失败次数。
pub fn record_row_failure() {
    metrics().row_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录输出指标条数。
pub fn record_metrics_emitted(count: usize) {
    metrics()
        .metrics_emitted
        .fetch_add(count as u64, Ordering::Relaxed);
}

/// 记录帧协议违规次数（超长、非法标志位、提前 EOF）。
pub fn record_framing_violation() {
    metrics().framing_violations.fetch_add(1, Ordering::Relaxed);
}

/// 记录对端上报的错误次数。
pub fn record_remote_fault() {
    metrics().remote_faults.fetch_add(1, Ordering::Relaxed);
}
