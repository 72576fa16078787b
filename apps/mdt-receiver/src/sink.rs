//! 把指标与错误写入结构化日志的 sink。

use async_trait::async_trait;
use domain::Metric;
use mdt_ingest::{DialoutError, MetricSink};
use tracing::{info, warn};

pub struct LogSink;

#[async_trait]
impl MetricSink for LogSink {
    async fn add_metric(&self, metric: Metric) {
        let tags = metric
            .tags
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        let fields = metric
            .fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",");
        info!(
            target: "mdt.receiver",
            measurement = %metric.name,
            tags = %tags,
            fields = %fields,
            ts_ms = metric.timestamp_ms,
            "metric"
        );
    }

    async fn add_error(&self, error: DialoutError) {
        warn!(target: "mdt.receiver", error = %error, "dialout_error");
    }
}
