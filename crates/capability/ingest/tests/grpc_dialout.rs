mod common;

use common::{Accumulator, assert_mock_metric, config, telemetry_message};
use mdt_ingest::Receiver;
use mdt_protocol::{DIALOUT_METHOD_PATH, MdtDialoutArgs};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::Streaming;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};

async fn connect(addr: SocketAddr) -> Grpc<Channel> {
    let channel = Endpoint::from_shared(format!("http://{}", addr))
        .expect("endpoint")
        .connect()
        .await
        .expect("connect");
    Grpc::new(channel)
}

/// 打开一条拨出流：返回请求发送端与（空的）响应流。
async fn open_stream(
    client: &mut Grpc<Channel>,
) -> (mpsc::Sender<MdtDialoutArgs>, Streaming<MdtDialoutArgs>) {
    let (tx, rx) = mpsc::channel(8);
    client.ready().await.expect("ready");
    let codec: ProstCodec<MdtDialoutArgs, MdtDialoutArgs> = ProstCodec::default();
    let response = client
        .streaming(
            tonic::Request::new(ReceiverStream::new(rx)),
            PathAndQuery::from_static(DIALOUT_METHOD_PATH),
            codec,
        )
        .await
        .expect("open stream");
    (tx, response.into_inner())
}

/// 等待服务端结束响应流。
async fn wait_closed(responses: &mut Streaming<MdtDialoutArgs>) {
    let next = responses.message().await;
    assert!(!matches!(next, Ok(Some(_))), "unexpected response message");
}

fn data(bytes: Vec<u8>) -> MdtDialoutArgs {
    MdtDialoutArgs {
        data: bytes,
        ..MdtDialoutArgs::default()
    }
}

fn remote_error(text: &str) -> MdtDialoutArgs {
    MdtDialoutArgs {
        errors: text.to_string(),
        ..MdtDialoutArgs::default()
    }
}

#[tokio::test]
async fn remote_error_ends_stream() {
    let acc = Arc::new(Accumulator::default());
    let receiver = Receiver::start(&config("grpc"), acc.clone())
        .await
        .expect("start");

    let mut client = connect(receiver.local_addr()).await;
    let (tx, mut responses) = open_stream(&mut client).await;
    tx.send(remote_error("foobar")).await.expect("send");
    wait_closed(&mut responses).await;
    drop(tx);
    receiver.stop().await;

    assert_eq!(acc.errors().await, vec!["GRPC dialout error: foobar"]);
}

#[tokio::test]
async fn multiple_streams_dispatch_independently() {
    let acc = Arc::new(Accumulator::default());
    let receiver = Receiver::start(&config("grpc"), acc.clone())
        .await
        .expect("start");
    let addr = receiver.local_addr();

    let mut client = connect(addr).await;
    let (tx, mut responses) = open_stream(&mut client).await;
    tx.send(MdtDialoutArgs {
        req_id: 456,
        ..data(telemetry_message("type:model/some/path"))
    })
    .await
    .expect("send");

    let mut client2 = connect(addr).await;
    let (tx2, mut responses2) = open_stream(&mut client2).await;
    tx2.send(data(telemetry_message("type:model/parallel/path")))
        .await
        .expect("send");
    tx2.send(remote_error("testclose")).await.expect("send");
    wait_closed(&mut responses2).await;
    drop(tx2);

    tx.send(data(telemetry_message("type:model/other/path")))
        .await
        .expect("send");
    tx.send(remote_error("testclose")).await.expect("send");
    wait_closed(&mut responses).await;
    drop(tx);
    receiver.stop().await;

    assert_eq!(
        acc.errors().await,
        vec!["GRPC dialout error: testclose", "GRPC dialout error: testclose"]
    );
    for (name, path) in [
        ("some", "type:model/some/path"),
        ("parallel", "type:model/parallel/path"),
        ("other", "type:model/other/path"),
    ] {
        let metric = acc.find(name).await.expect(name);
        assert_mock_metric(&metric, path);
    }
}

#[tokio::test]
async fn chunked_message_is_reassembled() {
    let acc = Arc::new(Accumulator::default());
    let receiver = Receiver::start(&config("grpc"), acc.clone())
        .await
        .expect("start");

    let message = telemetry_message("type:model/some/path");
    let total_size = message.len() as i32;
    let (head, tail) = message.split_at(message.len() / 2);

    let mut client = connect(receiver.local_addr()).await;
    let (tx, mut responses) = open_stream(&mut client).await;
    for chunk in [head, tail] {
        tx.send(MdtDialoutArgs {
            total_size,
            ..data(chunk.to_vec())
        })
        .await
        .expect("send");
    }
    tx.send(remote_error("done")).await.expect("send");
    wait_closed(&mut responses).await;
    drop(tx);
    receiver.stop().await;

    assert_eq!(acc.errors().await, vec!["GRPC dialout error: done"]);
    assert_eq!(acc.metrics().await.len(), 1);
    let metric = acc.find("some").await.expect("metric");
    assert_mock_metric(&metric, "type:model/some/path");
}

#[tokio::test]
async fn oversize_chunk_is_dropped() {
    let acc = Arc::new(Accumulator::default());
    let mut config = config("grpc");
    config.max_msg_size = 1024;
    let receiver = Receiver::start(&config, acc.clone())
        .await
        .expect("start");

    let mut client = connect(receiver.local_addr()).await;
    let (tx, mut responses) = open_stream(&mut client).await;
    tx.send(MdtDialoutArgs {
        total_size: 4096,
        ..data(vec![1, 2, 3])
    })
    .await
    .expect("send");
    tx.send(remote_error("done")).await.expect("send");
    wait_closed(&mut responses).await;
    drop(tx);
    receiver.stop().await;

    assert_eq!(
        acc.errors().await,
        vec!["dropped too large packet: 4096B > 1024B", "GRPC dialout error: done"]
    );
    assert!(acc.metrics().await.is_empty());
}

#[tokio::test]
async fn stop_ends_open_streams() {
    let acc = Arc::new(Accumulator::default());
    let receiver = Receiver::start(&config("grpc"), acc.clone())
        .await
        .expect("start");

    let mut client = connect(receiver.local_addr()).await;
    let (tx, _responses) = open_stream(&mut client).await;
    tx.send(data(telemetry_message("type:model/some/path")))
        .await
        .expect("send");

    // 等待消息被分发后再停止
    for _ in 0..100 {
        if !acc.metrics().await.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    receiver.stop().await;

    assert!(acc.errors().await.is_empty());
    assert_eq!(acc.metrics().await.len(), 1);
}
