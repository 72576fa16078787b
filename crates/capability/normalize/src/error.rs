/// 扁平化选项构建错误（启动期，致命）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("duplicate alias for encoding path: {0}")]
    DuplicateAlias(String),
    #[error("invalid embedded tag (expected <path>/<leaf>): {0}")]
    InvalidEmbeddedTag(String),
    #[error("unknown field conversion {conversion:?} for {path}/{field}")]
    UnknownConversion {
        path: String,
        field: String,
        conversion: String,
    },
}

/// 单行扁平化失败（跳过该行，其余行继续）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("row {row} of {path}: {kind}")]
pub struct TransformError {
    pub path: String,
    pub row: usize,
    pub kind: TransformErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformErrorKind {
    #[error("table row under {0} has no index value")]
    MissingTableIndex(String),
    #[error("entity {0} has neither rn nor dn")]
    MissingEntityName(String),
    #[error("nesting exceeds {0} levels")]
    TooDeep(usize),
}
