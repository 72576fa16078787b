use domain::{FieldNode, FieldValue, ScalarValue};

#[test]
fn scalar_tag_strings() {
    assert_eq!(ScalarValue::F64(3.0).to_tag_string(), "3");
    assert_eq!(ScalarValue::F64(2.5).to_tag_string(), "2.5");
    assert_eq!(ScalarValue::U32(0).to_tag_string(), "0");
    assert_eq!(ScalarValue::Bool(true).to_tag_string(), "true");
    assert_eq!(ScalarValue::Bytes(b"eth0".to_vec()).to_tag_string(), "eth0");
}

#[test]
fn field_values_keep_signedness() {
    assert_eq!(FieldValue::from(&ScalarValue::U32(128)), FieldValue::Uint(128));
    assert_eq!(FieldValue::from(&ScalarValue::I32(-1)), FieldValue::Int(-1));
    assert_eq!(
        FieldValue::from(&ScalarValue::Bytes(vec![0x0a, 0xff])),
        FieldValue::String("0aff".to_string())
    );
}

#[test]
fn field_node_builders() {
    let node = FieldNode::branch(
        "keys",
        vec![FieldNode::leaf("name", ScalarValue::String("eth0".to_string()))],
    )
    .with_delete(true);

    assert!(!node.is_leaf());
    assert!(node.delete);
    assert!(node.child("name").expect("child").is_leaf());
    assert!(node.child("missing").is_none());
}
