//! 协议错误类型定义

/// 记录解码错误（整条消息丢弃）。
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// protobuf 格式错误
    #[error("{0}")]
    Malformed(#[from] prost::DecodeError),

    /// 仅包含紧凑 GPB 行
    #[error("compact GPB encoding is not supported")]
    CompactGpb,
}

/// TCP 帧头校验错误（连接关闭）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// 声明长度超过上限
    #[error("dialout packet too long: {0}")]
    TooLong(u32),

    /// 标志位非零
    #[error("invalid dialout flags: {0}")]
    InvalidFlags(u16),
}
