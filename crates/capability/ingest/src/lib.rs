//! # 拨出接入能力模块
//!
//! 设备主动连接本接收器推送遥测：
//! - [`tcp_dialout`]：12 字节帧头 + 记录的 TCP 长连接
//! - [`grpc_dialout`]：`gRPCMdtDialout/MdtDialout` 双向流
//! - [`Receiver`]：选择传输方式、绑定地址、启动与停止监听
//!
//! 解码与扁平化的结果（指标与错误）统一交给 [`MetricSink`]。
//! 单条消息或单行出错不会中断连接以外的任何处理。

mod error;
mod handler;
mod receiver;
mod sink;

pub mod grpc_dialout;
pub mod tcp_dialout;

pub use error::{DialoutError, ReceiverError};
pub use handler::DialoutHandler;
pub use receiver::{Receiver, Transport};
pub use sink::{ChannelSink, MetricSink, NoopSink, SinkEvent};
