//! # 拨出协议能力模块
//!
//! 设备主动推送（dial-out）遥测时使用的线上格式：
//! - **TCP 帧**：12 字节大端帧头 + protobuf 记录
//! - **gRPC 双向流**：`MdtDialoutArgs` 单元，携带记录字节或对端错误
//! - **记录解码**：`telemetry_bis` 自描述字段树 → `domain::TelemetryRecord`
//!
//! ## 帧格式
//!
//! ```text
//! +----------+-----------+----------------+-----------+----------+
//! | MsgType  | MsgEncap  | MsgHdrVersion  | MsgFlags  | MsgLen   |
//! | u16 (BE) | u16 (BE)  | u16 (BE)       | u16 (BE)  | u32 (BE) |
//! +----------+-----------+----------------+-----------+----------+
//! | MsgLen 字节的 protobuf 记录                                    |
//! +---------------------------------------------------------------+
//! ```

mod decode;
mod error;
mod framing;
pub mod wire;

pub use decode::decode;
pub use error::{DecodeError, FramingError};
pub use framing::{DialoutHeader, HEADER_LEN};
pub use wire::MdtDialoutArgs;

/// gRPC 拨出服务全名。
pub const DIALOUT_SERVICE_NAME: &str = "mdt_dialout.gRPCMdtDialout";

/// gRPC 拨出方法路径。
pub const DIALOUT_METHOD_PATH: &str = "/mdt_dialout.gRPCMdtDialout/MdtDialout";
