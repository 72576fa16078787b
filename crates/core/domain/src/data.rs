/// 叶子节点携带的标量值。
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    String(String),
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F64(f64),
    Bytes(Vec<u8>),
}

impl ScalarValue {
    /// 作为标签值时的字符串形式。
    pub fn to_tag_string(&self) -> String {
        match self {
            Self::String(v) => v.clone(),
            Self::Bool(v) => v.to_string(),
            Self::I32(v) => v.to_string(),
            Self::I64(v) => v.to_string(),
            Self::U32(v) => v.to_string(),
            Self::U64(v) => v.to_string(),
            Self::F64(v) => v.to_string(),
            Self::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

/// 自描述字段树节点。
///
/// 正常情况下 `value` 与非空 `children` 只出现其一；匿名列表项的 `name` 为空。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldNode {
    pub name: String,
    pub value: Option<ScalarValue>,
    pub children: Vec<FieldNode>,
    pub delete: bool,
}

impl FieldNode {
    /// 构造叶子节点。
    pub fn leaf(name: impl Into<String>, value: ScalarValue) -> Self {
        Self {
            name: name.into(),
            value: Some(value),
            children: Vec::new(),
            delete: false,
        }
    }

    /// 构造带子节点的容器节点。
    pub fn branch(name: impl Into<String>, children: Vec<FieldNode>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children,
            delete: false,
        }
    }

    /// 构造匿名容器（列表项）。
    pub fn anonymous(children: Vec<FieldNode>) -> Self {
        Self::branch("", children)
    }

    pub fn with_delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }

    /// 按名称查找第一个直接子节点。
    pub fn child(&self, name: &str) -> Option<&FieldNode> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// 一条解码后的遥测记录（每条入站消息一份，处理后丢弃）。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TelemetryRecord {
    pub timestamp_ms: i64,
    pub encoding_path: String,
    pub node_id: String,
    pub subscription_id: String,
    pub rows: Vec<FieldNode>,
}
