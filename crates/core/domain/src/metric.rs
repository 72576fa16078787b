use crate::data::ScalarValue;
use std::collections::BTreeMap;

/// 标签集合（键唯一、有序，便于确定性输出与比较）。
pub type Tags = BTreeMap<String, String>;

/// 字段集合。
pub type Fields = BTreeMap<String, FieldValue>;

/// 输出指标的字段值。
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl From<&ScalarValue> for FieldValue {
    fn from(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::String(v) => Self::String(v.clone()),
            ScalarValue::Bool(v) => Self::Bool(*v),
            ScalarValue::I32(v) => Self::Int(i64::from(*v)),
            ScalarValue::I64(v) => Self::Int(*v),
            ScalarValue::U32(v) => Self::Uint(u64::from(*v)),
            ScalarValue::U64(v) => Self::Uint(*v),
            ScalarValue::F64(v) => Self::Float(*v),
            ScalarValue::Bytes(v) => Self::String(v.iter().map(|b| format!("{:02x}", b)).collect()),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Uint(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

/// 扁平化后的输出指标。
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub name: String,
    pub tags: Tags,
    pub fields: Fields,
    pub timestamp_ms: i64,
}

impl Metric {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}
