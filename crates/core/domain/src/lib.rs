pub mod data;
pub mod metric;

pub use data::{FieldNode, ScalarValue, TelemetryRecord};
pub use metric::{FieldValue, Fields, Metric, Tags};

/// 当前时间戳（毫秒）。
pub fn now_epoch_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
