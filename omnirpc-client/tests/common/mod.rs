//! Common test utilities for omnirpc-client integration tests
//!
//! Provides a listener that only counts accepted connections, to check that
//! caller-local failures never reach the network, and a small arithmetic
//! service served over either transport.

#![allow(dead_code)]

use omnirpc_core::{codec::TcpCodec, Error, Network};
use omnirpc_server::{MethodSet, RpcServer, Service};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Listener that accepts and immediately drops connections, counting them
pub struct RecordingListener {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
}

impl RecordingListener {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                drop(stream);
            }
        });

        Self { addr, accepted }
    }

    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Operands {
    pub a: i64,
    pub b: i64,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sum {
    pub value: i64,
}

/// Operands plus a caller label, flattened into one object
#[derive(Debug, Serialize, Deserialize)]
pub struct LabeledOperands {
    #[serde(flatten)]
    pub operands: Operands,
    pub label: String,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabeledSum {
    #[serde(flatten)]
    pub sum: Sum,
    pub label: String,
}

/// A measurement whose unit is left off the wire when unknown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

pub struct Arith;

impl Service for Arith {
    fn methods(self: Arc<Self>) -> MethodSet {
        MethodSet::new()
            .method("Add", |(a, b): (i64, i64)| async move { Ok(a + b) })
            .method("HttpAdd", |ops: Operands| async move {
                Ok(Sum { value: ops.a + ops.b })
            })
            .method("Div", |ops: Operands| async move {
                if ops.b == 0 {
                    return Err(Error::handler("division by zero"));
                }
                Ok(Sum { value: ops.a / ops.b })
            })
            .method("LabeledAdd", |args: LabeledOperands| async move {
                Ok(LabeledSum {
                    sum: Sum { value: args.operands.a + args.operands.b },
                    label: args.label,
                })
            })
            .method("Scale", |reading: Reading| async move {
                Ok(Reading {
                    value: reading.value * 10,
                    unit: reading.unit,
                })
            })
            .method("Lookup", |key: String| async move {
                Err::<Sum, _>(Error::handler(format!("rpc: can't find key {}", key)))
            })
    }
}

/// Start an arithmetic server on a loopback port
pub async fn arith_server(network: Network, codec: TcpCodec) -> (RpcServer, SocketAddr) {
    let mut server = RpcServer::builder(network)
        .service(Arith)
        .with_listener(TcpListener::bind("127.0.0.1:0").await.unwrap())
        .with_tcp_codec(codec)
        .with_http_path("/rpc")
        .build()
        .unwrap();
    let addr = server.start().await.unwrap();
    (server, addr)
}
