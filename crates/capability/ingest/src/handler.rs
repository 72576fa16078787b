use crate::error::DialoutError;
use crate::sink::MetricSink;
use mdt_normalize::Flattener;
use mdt_telemetry::{
    record_decode_failure, record_message_received, record_metrics_emitted, record_row_failure,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// 消息分发：解码 → 扁平化 → 交给 sink。
///
/// 两种传输共用；配置在启动后只读，可跨连接共享。
pub struct DialoutHandler {
    flattener: Flattener,
    sink: Arc<dyn MetricSink>,
}

impl DialoutHandler {
    pub fn new(flattener: Flattener, sink: Arc<dyn MetricSink>) -> Self {
        Self { flattener, sink }
    }

    /// 处理一条完整消息。解码失败整条丢弃，单行失败只丢该行。
    pub async fn handle(&self, bytes: &[u8]) {
        record_message_received(bytes.len());

        let record = match mdt_protocol::decode(bytes) {
            Ok(record) => record,
            Err(err) => {
                record_decode_failure();
                warn!(target: "mdt.ingest", error = %err, size = bytes.len(), "decode_failed");
                self.sink.add_error(DialoutError::Decode(err)).await;
                return;
            }
        };

        let flattened = self.flattener.flatten(&record);
        debug!(
            target: "mdt.ingest",
            path = %record.encoding_path,
            node_id = %record.node_id,
            rows = record.rows.len(),
            metrics = flattened.metrics.len(),
            errors = flattened.errors.len(),
            "message_flattened"
        );

        record_metrics_emitted(flattened.metrics.len());
        for metric in flattened.metrics {
            self.sink.add_metric(metric).await;
        }
        for err in flattened.errors {
            record_row_failure();
            self.sink.add_error(DialoutError::Row(err)).await;
        }
    }

    /// 上报连接/流级错误。
    pub async fn report(&self, err: DialoutError) {
        warn!(target: "mdt.ingest", error = %err, "dialout_error");
        self.sink.add_error(err).await;
    }
}
