use crate::error::DialoutError;
use async_trait::async_trait;
use domain::Metric;
use tokio::sync::mpsc;
use tracing::warn;

/// 指标与错误的接收方。
///
/// 处理是按连接串行的：某个连接在这里等待时只会阻塞它自己。
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn add_metric(&self, metric: Metric);

    async fn add_error(&self, error: DialoutError);
}

/// 丢弃一切（用于接线与测试）。
#[derive(Debug, Default)]
pub struct NoopSink;

#[async_trait]
impl MetricSink for NoopSink {
    async fn add_metric(&self, _metric: Metric) {}

    async fn add_error(&self, _error: DialoutError) {}
}

/// 通道事件。
#[derive(Debug)]
pub enum SinkEvent {
    Metric(Metric),
    Error(DialoutError),
}

/// 转发到 tokio mpsc 通道；通道满时等待（背压传回对应连接）。
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SinkEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SinkEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    async fn forward(&self, event: SinkEvent) {
        if self.tx.send(event).await.is_err() {
            warn!(target: "mdt.ingest", "sink_channel_closed");
        }
    }
}

#[async_trait]
impl MetricSink for ChannelSink {
    async fn add_metric(&self, metric: Metric) {
        self.forward(SinkEvent::Metric(metric)).await;
    }

    async fn add_error(&self, error: DialoutError) {
        self.forward(SinkEvent::Error(error)).await;
    }
}
