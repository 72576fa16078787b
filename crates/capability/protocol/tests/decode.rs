use domain::ScalarValue;
use mdt_protocol::wire::{
    Telemetry, TelemetryField, TelemetryGpbTable, TelemetryRowGpb, telemetry,
    telemetry_field::ValueByType,
};
use mdt_protocol::{DecodeError, decode};
use prost::Message;

fn leaf(name: &str, value: ValueByType) -> TelemetryField {
    TelemetryField {
        name: name.to_string(),
        value_by_type: Some(value),
        ..TelemetryField::default()
    }
}

fn branch(name: &str, fields: Vec<TelemetryField>) -> TelemetryField {
    TelemetryField {
        name: name.to_string(),
        fields,
        ..TelemetryField::default()
    }
}

#[test]
fn decode_builds_field_tree() {
    let msg = Telemetry {
        node_id: Some(telemetry::NodeId::NodeIdStr("hostname".to_string())),
        subscription: Some(telemetry::Subscription::SubscriptionIdStr(
            "subscription".to_string(),
        )),
        encoding_path: "type:model/some/path".to_string(),
        msg_timestamp: 1_543_236_572_000,
        data_gpbkv: vec![TelemetryField {
            delete: true,
            ..branch(
                "",
                vec![
                    branch(
                        "keys",
                        vec![leaf("name", ValueByType::StringValue("str".to_string()))],
                    ),
                    branch(
                        "content",
                        vec![
                            leaf("value", ValueByType::Sint64Value(-1)),
                            leaf("ratio", ValueByType::FloatValue(0.5)),
                            leaf("count", ValueByType::Uint32Value(7)),
                        ],
                    ),
                ],
            )
        }],
        ..Telemetry::default()
    };

    let record = decode(&msg.encode_to_vec()).expect("decode");
    assert_eq!(record.node_id, "hostname");
    assert_eq!(record.subscription_id, "subscription");
    assert_eq!(record.encoding_path, "type:model/some/path");
    assert_eq!(record.timestamp_ms, 1_543_236_572_000);
    assert_eq!(record.rows.len(), 1);

    let row = &record.rows[0];
    assert!(row.delete);
    assert_eq!(row.name, "");
    let keys = row.child("keys").expect("keys");
    assert_eq!(
        keys.children[0].value,
        Some(ScalarValue::String("str".to_string()))
    );
    let content = row.child("content").expect("content");
    assert_eq!(content.children[0].value, Some(ScalarValue::I64(-1)));
    assert_eq!(content.children[1].value, Some(ScalarValue::F64(0.5)));
    assert_eq!(content.children[2].value, Some(ScalarValue::U32(7)));
}

#[test]
fn decode_normalizes_alternate_ids() {
    let uuid_bytes = vec![
        0x67, 0xe5, 0x50, 0x44, 0x10, 0xb1, 0x42, 0x6f, 0x92, 0x47, 0xbb, 0x68, 0x0e, 0x5f,
        0xe0, 0xc8,
    ];
    let msg = Telemetry {
        node_id: Some(telemetry::NodeId::NodeIdUuid(uuid_bytes)),
        subscription: Some(telemetry::Subscription::SubscriptionId(42)),
        ..Telemetry::default()
    };
    let record = decode(&msg.encode_to_vec()).expect("decode");
    assert_eq!(record.node_id, "67e55044-10b1-426f-9247-bb680e5fe0c8");
    assert_eq!(record.subscription_id, "42");

    let msg = Telemetry {
        node_id: Some(telemetry::NodeId::NodeIdUuid(vec![0xab, 0x01])),
        ..Telemetry::default()
    };
    let record = decode(&msg.encode_to_vec()).expect("decode");
    assert_eq!(record.node_id, "ab01");
    assert_eq!(record.subscription_id, "");
}

#[test]
fn decode_rejects_malformed_bytes() {
    let err = decode(&[0xff, 0xff, 0xff]).unwrap_err();
    assert!(matches!(err, DecodeError::Malformed(_)));
}

#[test]
fn decode_rejects_compact_only_records() {
    let msg = Telemetry {
        encoding_path: "type:model/compact".to_string(),
        data_gpb: Some(TelemetryGpbTable {
            row: vec![TelemetryRowGpb {
                timestamp: 1,
                keys: vec![1, 2],
                content: vec![3, 4],
            }],
        }),
        ..Telemetry::default()
    };
    let err = decode(&msg.encode_to_vec()).unwrap_err();
    assert!(matches!(err, DecodeError::CompactGpb));
    assert_eq!(err.to_string(), "compact GPB encoding is not supported");
}
