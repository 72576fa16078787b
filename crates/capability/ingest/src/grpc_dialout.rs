//! gRPC 拨出监听（`mdt_dialout.gRPCMdtDialout/MdtDialout` 双向流）。
//!
//! 服务只读取请求流、从不回写：每个流一个任务，任务结束时响应流随之关闭。
//! - `data` 且 `total_size == 0`：完整消息，直接分发
//! - `data` 且 `total_size > 0`：分片，累积到 `total_size` 后分发
//! - `errors` 非空：上报对端故障并结束该流

use crate::error::DialoutError;
use crate::handler::DialoutHandler;
use mdt_config::EnforcementPolicy;
use mdt_protocol::{DIALOUT_METHOD_PATH, DIALOUT_SERVICE_NAME, MdtDialoutArgs};
use mdt_telemetry::{
    new_connection_id, record_connection_accepted, record_remote_fault, record_stream_accepted,
};
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::codec::ProstCodec;
use tonic::codegen::{Body, BoxFuture, Service, StdError, empty_body, http};
use tonic::server::{Grpc, NamedService, StreamingService};
use tonic::{Status, Streaming};
use tracing::{Instrument, debug, error, info_span, warn};

type ResponseStream = ReceiverStream<Result<MdtDialoutArgs, Status>>;

/// 停止后等待连接关闭的 keepalive 超时。
const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(20);

/// 运行 gRPC 服务直到停止信号，随后等待所有流任务结束。
pub async fn serve(
    listener: TcpListener,
    handler: Arc<DialoutHandler>,
    max_msg_size: usize,
    policy: EnforcementPolicy,
    stop: watch::Receiver<bool>,
) {
    let service = DialoutService::new(handler, max_msg_size, stop.clone());
    let streams = Arc::clone(&service.inner);

    // 客户端 ping 策略无法在 h2 服务端强制，这里折算为服务端 keepalive 间隔
    let keepalive_interval = (policy.keepalive_min_time_secs > 0)
        .then(|| Duration::from_secs(policy.keepalive_min_time_secs));
    debug!(
        target: "mdt.ingest",
        permit_without_calls = policy.permit_keepalive_without_calls,
        keepalive_min_time_secs = policy.keepalive_min_time_secs,
        "grpc_keepalive_policy"
    );

    let incoming = TcpListenerStream::new(listener).map(|accepted| {
        if accepted.is_ok() {
            record_connection_accepted();
        }
        accepted
    });
    let mut signal = stop;
    let shutdown = async move {
        let _ = signal.changed().await;
    };

    let result = tonic::transport::Server::builder()
        .http2_keepalive_interval(keepalive_interval)
        .http2_keepalive_timeout(Some(KEEPALIVE_TIMEOUT))
        .add_service(service)
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await;
    if let Err(err) = result {
        error!(target: "mdt.ingest", error = %err, "grpc_server_failed");
    }

    let mut tasks = {
        let mut guard = streams.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    };
    debug!(target: "mdt.ingest", pending = tasks.len(), "grpc_listener_stopping");
    while tasks.join_next().await.is_some() {}
}

struct StreamContext {
    handler: Arc<DialoutHandler>,
    max_msg_size: usize,
    stop: watch::Receiver<bool>,
    tasks: Mutex<JoinSet<()>>,
}

impl StreamContext {
    /// 为新流启动接收任务，返回随任务结束而关闭的空响应流。
    fn accept(
        &self,
        request: tonic::Request<Streaming<MdtDialoutArgs>>,
    ) -> tonic::Response<ResponseStream> {
        record_stream_accepted();
        let peer = request.remote_addr();
        let stream = request.into_inner();
        let (tx, rx) = mpsc::channel(1);

        let span = info_span!("grpc_dialout", conn_id = %new_connection_id(), peer = ?peer);
        let task = receive(
            stream,
            Arc::clone(&self.handler),
            self.max_msg_size,
            self.stop.clone(),
        );

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(
            async move {
                task.await;
                drop(tx);
            }
            .instrument(span),
        );

        tonic::Response::new(ReceiverStream::new(rx))
    }
}

async fn receive(
    mut stream: Streaming<MdtDialoutArgs>,
    handler: Arc<DialoutHandler>,
    max_msg_size: usize,
    mut stop: watch::Receiver<bool>,
) {
    let mut chunks: Vec<u8> = Vec::new();

    loop {
        let next = tokio::select! {
            _ = stop.changed() => break,
            next = stream.message() => next,
        };
        let args = match next {
            Ok(Some(args)) => args,
            Ok(None) => {
                debug!(target: "mdt.ingest", "grpc_stream_closed");
                break;
            }
            Err(status) => {
                if !*stop.borrow() {
                    handler.report(DialoutError::Receive(status)).await;
                }
                break;
            }
        };

        if !args.data.is_empty() {
            if args.total_size <= 0 {
                handler.handle(&args.data).await;
            } else {
                let total = args.total_size as usize;
                if total > max_msg_size {
                    handler
                        .report(DialoutError::ChunkTooLarge {
                            size: total,
                            max: max_msg_size,
                        })
                        .await;
                } else {
                    chunks.extend_from_slice(&args.data);
                    if chunks.len() >= total {
                        handler.handle(&chunks).await;
                        chunks.clear();
                    }
                }
            }
        }

        if !args.errors.is_empty() {
            record_remote_fault();
            debug!(target: "mdt.ingest", req_id = args.req_id, "grpc_remote_fault");
            handler.report(DialoutError::Remote(args.errors)).await;
            break;
        }
    }

    if !chunks.is_empty() {
        warn!(target: "mdt.ingest", buffered = chunks.len(), "grpc_incomplete_chunk_discarded");
    }
}

/// 手写的 `gRPCMdtDialout` 服务（只有一个双向流方法）。
#[derive(Clone)]
pub struct DialoutService {
    inner: Arc<StreamContext>,
}

impl DialoutService {
    fn new(
        handler: Arc<DialoutHandler>,
        max_msg_size: usize,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            inner: Arc::new(StreamContext {
                handler,
                max_msg_size,
                stop,
                tasks: Mutex::new(JoinSet::new()),
            }),
        }
    }
}

struct MdtDialoutSvc(Arc<StreamContext>);

impl StreamingService<MdtDialoutArgs> for MdtDialoutSvc {
    type Response = MdtDialoutArgs;
    type ResponseStream = ResponseStream;
    type Future = BoxFuture<tonic::Response<Self::ResponseStream>, Status>;

    fn call(&mut self, request: tonic::Request<Streaming<MdtDialoutArgs>>) -> Self::Future {
        let ctx = Arc::clone(&self.0);
        Box::pin(async move { Ok(ctx.accept(request)) })
    }
}

impl<B> Service<http::Request<B>> for DialoutService
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        if req.uri().path() != DIALOUT_METHOD_PATH {
            return Box::pin(async move {
                let mut response = http::Response::new(empty_body());
                let headers = response.headers_mut();
                headers.insert(Status::GRPC_STATUS, (tonic::Code::Unimplemented as i32).into());
                headers.insert(http::header::CONTENT_TYPE, tonic::metadata::GRPC_CONTENT_TYPE);
                Ok(response)
            });
        }

        let method = MdtDialoutSvc(Arc::clone(&self.inner));
        let max_msg_size = self.inner.max_msg_size;
        Box::pin(async move {
            let codec: ProstCodec<MdtDialoutArgs, MdtDialoutArgs> = ProstCodec::default();
            let mut grpc = Grpc::new(codec).max_decoding_message_size(max_msg_size);
            Ok(grpc.streaming(method, req).await)
        })
    }
}

impl NamedService for DialoutService {
    const NAME: &'static str = DIALOUT_SERVICE_NAME;
}
