//! TCP 拨出监听。
//!
//! 每个连接一个任务，按以下状态循环：
//!
//! ```text
//! AWAIT_HEADER --12B--> VALIDATE --ok--> AWAIT_BODY --N B--> DISPATCH --+
//!      ^                   | 超长/标志位非零: 上报并关闭               |
//!      +-------------------------------------------------------------+
//! ```
//!
//! 帧头阶段遇到 EOF 视为正常关闭；记录体读不满为 `premature EOF`。

use crate::error::DialoutError;
use crate::handler::DialoutHandler;
use mdt_protocol::{DialoutHeader, HEADER_LEN};
use mdt_telemetry::{new_connection_id, record_connection_accepted, record_framing_violation};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};

/// 接受循环：直到停止信号；停止后等待所有连接任务结束。
pub async fn serve(
    listener: TcpListener,
    handler: Arc<DialoutHandler>,
    max_msg_size: usize,
    mut stop: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = stop.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    record_connection_accepted();
                    let span = info_span!(
                        "tcp_dialout",
                        conn_id = %new_connection_id(),
                        peer = %peer
                    );
                    let handler = Arc::clone(&handler);
                    connections.spawn(
                        handle_connection(stream, peer, handler, max_msg_size, stop.clone())
                            .instrument(span),
                    );
                }
                Err(err) => {
                    warn!(target: "mdt.ingest", error = %err, "tcp_accept_failed");
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    debug!(target: "mdt.ingest", pending = connections.len(), "tcp_listener_stopping");
    while connections.join_next().await.is_some() {}
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<DialoutHandler>,
    max_msg_size: usize,
    mut stop: watch::Receiver<bool>,
) {
    info!(target: "mdt.ingest", peer = %peer, "tcp_connection_accepted");
    let mut header_buf = [0u8; HEADER_LEN];

    loop {
        let read = tokio::select! {
            _ = stop.changed() => return,
            read = stream.read_exact(&mut header_buf) => read,
        };
        match read {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                debug!(target: "mdt.ingest", peer = %peer, "tcp_connection_closed");
                return;
            }
            Err(err) => {
                handler.report(DialoutError::Tcp(err)).await;
                return;
            }
        }

        let header = DialoutHeader::parse(&header_buf);
        let len = match header.validate(max_msg_size) {
            Ok(len) => len,
            Err(err) => {
                record_framing_violation();
                handler.report(DialoutError::Framing(err)).await;
                return;
            }
        };

        let mut body = vec![0u8; len];
        let read = tokio::select! {
            _ = stop.changed() => return,
            read = stream.read_exact(&mut body) => read,
        };
        match read {
            Ok(_) => handler.handle(&body).await,
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
                record_framing_violation();
                handler.report(DialoutError::PrematureEof).await;
                return;
            }
            Err(err) => {
                handler.report(DialoutError::Tcp(err)).await;
                return;
            }
        }
    }
}
