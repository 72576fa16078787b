use mdt_telemetry::{
    metrics, new_connection_id, record_message_received, record_metrics_emitted,
};

#[test]
fn connection_ids_unique() {
    let first = new_connection_id();
    let second = new_connection_id();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[test]
fn counters_accumulate() {
    let before = metrics().snapshot();
    record_message_received(128);
    record_metrics_emitted(3);
    let after = metrics().snapshot();

    assert!(after.messages_received >= before.messages_received + 1);
    assert!(after.bytes_received >= before.bytes_received + 128);
    assert!(after.metrics_emitted >= before.metrics_emitted + 3);
}
