//! End-to-end TCP tests: real listener, real client, both codecs

mod common;

use common::{arith_server, start_server, Arith, Operands, Sum};
use futures::future::join_all;
use omnirpc_client::RpcClient;
use omnirpc_core::{codec::TcpCodec, Error, Network};
use omnirpc_server::{RpcServer, ServerState, ServiceRegistration};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn client(addr: std::net::SocketAddr, codec: TcpCodec) -> RpcClient {
    RpcClient::new(Network::Tcp, None)
        .with_server_addr(addr.to_string())
        .with_tcp_codec(codec)
}

#[tokio::test]
async fn test_add_over_each_codec() {
    for codec in [TcpCodec::Json, TcpCodec::Binary] {
        let (mut server, addr) = arith_server(Network::Tcp, codec).await;

        let mut reply = 0i64;
        client(addr, codec)
            .submit("Arith.Add", &(10i64, 20i64), &mut reply)
            .await
            .unwrap();
        assert_eq!(reply, 30, "codec {}", codec);

        let sum: Sum = client(addr, codec)
            .call("Arith.HttpAdd", &Operands { a: 2, b: 3 })
            .await
            .unwrap();
        assert_eq!(sum, Sum { value: 5 });

        server.shutdown().await;
    }
}

#[tokio::test]
async fn test_concurrent_calls() {
    let (mut server, addr) = arith_server(Network::Tcp, TcpCodec::Binary).await;
    let client = client(addr, TcpCodec::Binary);

    let calls = (0..100i64).map(|n| {
        let client = client.clone();
        async move { (n, client.call::<_, i64>("Arith.Double", &n).await) }
    });

    for (n, result) in join_all(calls).await {
        assert_eq!(result.unwrap(), n * 2);
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_handler_and_lookup_errors() {
    let (mut server, addr) = arith_server(Network::Tcp, TcpCodec::Json).await;
    let client = client(addr, TcpCodec::Json);

    match client.call::<_, Sum>("Arith.Fail", &Operands { a: 1, b: 2 }).await {
        Err(Error::Handler(msg)) => assert_eq!(msg, "arith failed"),
        other => panic!("Expected Handler error, got {:?}", other),
    }
    match client.call::<_, i64>("Arith.Nope", &1i64).await {
        Err(Error::MethodNotFound(msg)) => assert_eq!(msg, "rpc: can't find method Arith.Nope"),
        other => panic!("Expected MethodNotFound error, got {:?}", other),
    }
    match client.call::<_, i64>("Geometry.Area", &1i64).await {
        Err(Error::MethodNotFound(msg)) => {
            assert_eq!(msg, "rpc: can't find service Geometry.Area")
        }
        other => panic!("Expected MethodNotFound error, got {:?}", other),
    }
    assert!(matches!(
        client.call::<_, i64>("Arith.Double", &"two").await,
        Err(Error::Decode(_))
    ));

    server.shutdown().await;
}

#[tokio::test]
async fn test_same_service_in_two_servers() {
    let shared = Arc::new(Arith);
    let (mut first, first_addr) = start_server(
        Network::Tcp,
        TcpCodec::Json,
        vec![ServiceRegistration::from_arc(shared.clone())],
    )
    .await;
    let (mut second, second_addr) = start_server(
        Network::Tcp,
        TcpCodec::Binary,
        vec![ServiceRegistration::from_arc(shared)],
    )
    .await;

    let a: i64 = client(first_addr, TcpCodec::Json)
        .call("Arith.Add", &(1i64, 1i64))
        .await
        .unwrap();
    let b: i64 = client(second_addr, TcpCodec::Binary)
        .call("Arith.Add", &(2i64, 2i64))
        .await
        .unwrap();
    assert_eq!((a, b), (2, 4));

    first.shutdown().await;
    let c: i64 = client(second_addr, TcpCodec::Binary)
        .call("Arith.Add", &(3i64, 3i64))
        .await
        .unwrap();
    assert_eq!(c, 6);
    second.shutdown().await;
}

#[tokio::test]
async fn test_json_client_against_binary_server() {
    let (mut server, addr) = arith_server(Network::Tcp, TcpCodec::Binary).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"{\"method\":\"Arith.Add\",\"params\":[[1,2]],\"id\":1}\n")
        .await
        .unwrap();

    // The server answers with an error frame and hangs up
    let mut received = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received)).await;
    assert!(read.is_ok(), "server kept the connection open");

    server.shutdown().await;
}

#[tokio::test]
async fn test_pipelined_requests_on_one_connection() {
    let (mut server, addr) = arith_server(Network::Tcp, TcpCodec::Json).await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"{\"method\":\"Arith.Double\",\"params\":[1],\"id\":1}\n\
              {\"method\":\"Arith.Double\",\"params\":[2],\"id\":\"two\"}\n",
        )
        .await
        .unwrap();
    stream.shutdown().await.unwrap();

    let mut received = String::new();
    stream.read_to_string(&mut received).await.unwrap();
    let lines: Vec<serde_json::Value> = received
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], 1);
    assert_eq!(lines[0]["result"], 2);
    assert_eq!(lines[1]["id"], "two");
    assert_eq!(lines[1]["result"], 4);

    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_refuses_new_connections() {
    let (mut server, addr) = arith_server(Network::Tcp, TcpCodec::Json).await;
    server.shutdown().await;
    assert_eq!(server.state(), ServerState::Stopped);

    let result = client(addr, TcpCodec::Json)
        .call::<_, i64>("Arith.Add", &(1i64, 2i64))
        .await;
    assert!(matches!(result, Err(Error::Dial(_))));

    server.shutdown().await;
    assert_eq!(server.state(), ServerState::Stopped);
    assert!(matches!(server.start().await, Err(Error::Configuration(_))));
}

#[tokio::test]
async fn test_max_connections_holds_back_extra_clients() {
    let mut server = RpcServer::builder(Network::Tcp)
        .service(Arith)
        .with_listener(TcpListener::bind("127.0.0.1:0").await.unwrap())
        .max_connections(1)
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();

    let idle = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let waiting = client(addr, TcpCodec::Json);
    let mut call = tokio::spawn(async move { waiting.call::<_, i64>("Arith.Double", &21i64).await });

    assert!(
        tokio::time::timeout(Duration::from_millis(200), &mut call).await.is_err(),
        "second connection was served while the first held the only slot"
    );

    drop(idle);
    let result = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("call did not complete after the slot was freed")
        .unwrap();
    assert_eq!(result.unwrap(), 42);

    server.shutdown().await;
}
