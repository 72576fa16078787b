#![allow(dead_code)]

use async_trait::async_trait;
use domain::{FieldValue, Metric};
use mdt_config::ReceiverConfig;
use mdt_ingest::{DialoutError, MetricSink};
use mdt_protocol::wire::{Telemetry, TelemetryField, telemetry, telemetry_field::ValueByType};
use prost::Message;
use tokio::sync::Mutex;

/// 收集指标与错误文本的测试 sink。
#[derive(Default)]
pub struct Accumulator {
    metrics: Mutex<Vec<Metric>>,
    errors: Mutex<Vec<String>>,
}

impl Accumulator {
    pub async fn metrics(&self) -> Vec<Metric> {
        self.metrics.lock().await.clone()
    }

    pub async fn errors(&self) -> Vec<String> {
        self.errors.lock().await.clone()
    }

    pub async fn find(&self, name: &str) -> Option<Metric> {
        self.metrics
            .lock()
            .await
            .iter()
            .find(|metric| metric.name == name)
            .cloned()
    }
}

#[async_trait]
impl MetricSink for Accumulator {
    async fn add_metric(&self, metric: Metric) {
        self.metrics.lock().await.push(metric);
    }

    async fn add_error(&self, error: DialoutError) {
        self.errors.lock().await.push(error.to_string());
    }
}

pub fn config(transport: &str) -> ReceiverConfig {
    let mut config = ReceiverConfig {
        transport: transport.to_string(),
        service_address: "127.0.0.1:0".to_string(),
        ..ReceiverConfig::default()
    };
    for (alias, path) in [
        ("some", "type:model/some/path"),
        ("parallel", "type:model/parallel/path"),
        ("other", "type:model/other/path"),
    ] {
        config.aliases.insert(alias.to_string(), path.to_string());
    }
    config
}

/// 一行 keys{name=str} content{value=-1} 的记录。
pub fn telemetry_message(path: &str) -> Vec<u8> {
    let field = |name: &str, value: ValueByType| TelemetryField {
        name: name.to_string(),
        value_by_type: Some(value),
        ..TelemetryField::default()
    };
    let branch = |name: &str, fields: Vec<TelemetryField>| TelemetryField {
        name: name.to_string(),
        fields,
        ..TelemetryField::default()
    };

    Telemetry {
        msg_timestamp: 1_543_236_572_000,
        encoding_path: path.to_string(),
        node_id: Some(telemetry::NodeId::NodeIdStr("hostname".to_string())),
        subscription: Some(telemetry::Subscription::SubscriptionIdStr(
            "subscription".to_string(),
        )),
        data_gpbkv: vec![branch(
            "",
            vec![
                branch(
                    "keys",
                    vec![field("name", ValueByType::StringValue("str".to_string()))],
                ),
                branch("content", vec![field("value", ValueByType::Sint64Value(-1))]),
            ],
        )],
        ..Telemetry::default()
    }
    .encode_to_vec()
}

pub fn assert_mock_metric(metric: &Metric, path: &str) {
    assert_eq!(metric.tag("path"), Some(path));
    assert_eq!(metric.tag("name"), Some("str"));
    assert_eq!(metric.tag("source"), Some("hostname"));
    assert_eq!(metric.tag("subscription"), Some("subscription"));
    assert_eq!(metric.field("value"), Some(&FieldValue::Int(-1)));
}
