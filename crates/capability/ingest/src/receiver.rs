use crate::error::ReceiverError;
use crate::handler::DialoutHandler;
use crate::sink::MetricSink;
use crate::{grpc_dialout, tcp_dialout};
use mdt_config::ReceiverConfig;
use mdt_normalize::{FlattenOptions, Flattener};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 拨出传输方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Grpc,
}

impl FromStr for Transport {
    type Err = ReceiverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "tcp" => Ok(Self::Tcp),
            "grpc" => Ok(Self::Grpc),
            other => Err(ReceiverError::InvalidTransport(other.to_string())),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Grpc => f.write_str("grpc"),
        }
    }
}

/// 运行中的接收器。
///
/// `start` 成功即表示地址已绑定、监听任务已启动；失败时不留下任何运行中的任务。
pub struct Receiver {
    transport: Transport,
    local_addr: SocketAddr,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Receiver {
    /// 校验配置、绑定地址并启动监听。
    pub async fn start(
        config: &ReceiverConfig,
        sink: Arc<dyn MetricSink>,
    ) -> Result<Self, ReceiverError> {
        let transport: Transport = config.transport.parse()?;
        config.validate()?;
        let options = FlattenOptions::from_config(config)?;
        let handler = Arc::new(DialoutHandler::new(Flattener::new(options), sink));

        let bind_error = |source: std::io::Error| ReceiverError::Bind {
            addr: config.service_address.clone(),
            source,
        };
        let listener = TcpListener::bind(&config.service_address)
            .await
            .map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = match transport {
            Transport::Tcp => tokio::spawn(tcp_dialout::serve(
                listener,
                handler,
                config.max_msg_size,
                stop_rx,
            )),
            Transport::Grpc => tokio::spawn(grpc_dialout::serve(
                listener,
                handler,
                config.max_msg_size,
                config.enforcement_policy.clone(),
                stop_rx,
            )),
        };

        info!(
            target: "mdt.ingest",
            transport = %transport,
            addr = %local_addr,
            max_msg_size = config.max_msg_size,
            "dialout_receiver_started"
        );
        Ok(Self {
            transport,
            local_addr,
            stop_tx,
            task,
        })
    }

    /// 实际绑定的地址（配置端口为 0 时由系统分配）。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// 停止接受新连接，等待进行中的分发与所有连接/流任务结束后释放监听。
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(err) = self.task.await {
            warn!(target: "mdt.ingest", error = %err, "dialout_listener_join_failed");
        }
        info!(target: "mdt.ingest", addr = %self.local_addr, "dialout_receiver_stopped");
    }
}
