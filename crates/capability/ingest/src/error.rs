use mdt_config::ConfigError;
use mdt_normalize::{NormalizeError, TransformError};
use mdt_protocol::{DecodeError, FramingError};

/// 运行期错误：经 `MetricSink::add_error` 上报，不会终止进程。
#[derive(Debug, thiserror::Error)]
pub enum DialoutError {
    #[error(transparent)]
    Framing(#[from] FramingError),
    #[error("TCP dialout premature EOF")]
    PrematureEof,
    #[error("TCP dialout error: {0}")]
    Tcp(#[source] std::io::Error),
    /// 对端通过 `errors` 报告的故障
    #[error("GRPC dialout error: {0}")]
    Remote(String),
    #[error("receive error during GRPC dialout: {0}")]
    Receive(#[source] tonic::Status),
    #[error("dropped too large packet: {size}B > {max}B")]
    ChunkTooLarge { size: usize, max: usize },
    #[error("failed to decode: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Row(#[from] TransformError),
}

/// 启动错误（唯一的致命错误类别）。
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    #[error("invalid dialout transport: {0}")]
    InvalidTransport(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Options(#[from] NormalizeError),
}
