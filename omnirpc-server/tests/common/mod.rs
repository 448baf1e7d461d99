//! Common test utilities for omnirpc-server integration tests

#![allow(dead_code)]

use omnirpc_core::{codec::TcpCodec, Error, Network};
use omnirpc_server::{MethodSet, RpcServer, Service, ServiceRegistration};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operands {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sum {
    pub value: i64,
}

/// Arithmetic service used across the integration tests
pub struct Arith;

impl Service for Arith {
    fn methods(self: Arc<Self>) -> MethodSet {
        MethodSet::new()
            .method("Add", |(a, b): (i64, i64)| async move { Ok(a + b) })
            .method("HttpAdd", |ops: Operands| async move {
                Ok(Sum { value: ops.a + ops.b })
            })
            .method("Double", |n: i64| async move { Ok(n * 2) })
            .method("Fail", |_: Operands| async move {
                Err::<Sum, _>(Error::handler("arith failed"))
            })
    }
}

/// A service with no methods at all
pub struct Empty;

impl Service for Empty {
    fn methods(self: Arc<Self>) -> MethodSet {
        MethodSet::new()
    }
}

/// Build and start a server on a loopback port
pub async fn start_server(
    network: Network,
    codec: TcpCodec,
    registrations: Vec<ServiceRegistration>,
) -> (RpcServer, SocketAddr) {
    let mut server = RpcServer::builder(network)
        .registrations(registrations)
        .with_listener(TcpListener::bind("127.0.0.1:0").await.unwrap())
        .with_tcp_codec(codec)
        .with_http_path("/rpc")
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();
    (server, addr)
}

pub async fn arith_server(network: Network, codec: TcpCodec) -> (RpcServer, SocketAddr) {
    start_server(network, codec, vec![ServiceRegistration::new(Arith)]).await
}
