//! 记录解码：protobuf 字节 → 通用字段树。

use crate::error::DecodeError;
use crate::wire::{self, telemetry, telemetry_field::ValueByType};
use domain::{FieldNode, ScalarValue, TelemetryRecord};
use prost::Message;

/// 解码一条遥测记录。
///
/// 纯函数：失败时不产生任何部分结果。
pub fn decode(bytes: &[u8]) -> Result<TelemetryRecord, DecodeError> {
    let msg = wire::Telemetry::decode(bytes)?;

    let has_compact_rows = msg
        .data_gpb
        .as_ref()
        .is_some_and(|table| !table.row.is_empty());
    if msg.data_gpbkv.is_empty() && has_compact_rows {
        return Err(DecodeError::CompactGpb);
    }

    Ok(TelemetryRecord {
        timestamp_ms: i64::try_from(msg.msg_timestamp).unwrap_or(i64::MAX),
        node_id: node_id(msg.node_id),
        subscription_id: subscription_id(msg.subscription),
        encoding_path: msg.encoding_path,
        rows: msg.data_gpbkv.into_iter().map(field_node).collect(),
    })
}

fn node_id(node_id: Option<telemetry::NodeId>) -> String {
    match node_id {
        Some(telemetry::NodeId::NodeIdStr(id)) => id,
        Some(telemetry::NodeId::NodeIdUuid(bytes)) => match uuid::Uuid::from_slice(&bytes) {
            Ok(id) => id.hyphenated().to_string(),
            Err(_) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
        },
        None => String::new(),
    }
}

fn subscription_id(subscription: Option<telemetry::Subscription>) -> String {
    match subscription {
        Some(telemetry::Subscription::SubscriptionIdStr(id)) => id,
        Some(telemetry::Subscription::SubscriptionId(id)) => id.to_string(),
        None => String::new(),
    }
}

fn field_node(field: wire::TelemetryField) -> FieldNode {
    let value = field.value_by_type.map(|value| match value {
        ValueByType::BytesValue(v) => ScalarValue::Bytes(v),
        ValueByType::StringValue(v) => ScalarValue::String(v),
        ValueByType::BoolValue(v) => ScalarValue::Bool(v),
        ValueByType::Uint32Value(v) => ScalarValue::U32(v),
        ValueByType::Uint64Value(v) => ScalarValue::U64(v),
        ValueByType::Sint32Value(v) => ScalarValue::I32(v),
        ValueByType::Sint64Value(v) => ScalarValue::I64(v),
        ValueByType::DoubleValue(v) => ScalarValue::F64(v),
        ValueByType::FloatValue(v) => ScalarValue::F64(f64::from(v)),
    });

    FieldNode {
        name: field.name,
        value,
        children: field.fields.into_iter().map(field_node).collect(),
        delete: field.delete,
    }
}
