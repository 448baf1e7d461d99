//! omnirpc: one RPC API over TCP or HTTP
//!
//! This is the convenience crate that re-exports every omnirpc sub-crate.
//! Use it if you want a single dependency for both sides of a call.
//!
//! # Architecture
//!
//! - **omnirpc-core**: error taxonomy, payloads, TCP codecs, address resolution, observability
//! - **omnirpc-server**: service registration, dispatch, TCP and HTTP serving
//! - **omnirpc-client**: the calling side for both transports
//! - **omnirpc-tasks**: interface to a background task queue
//!
//! # Quick Start - Server
//!
//! ```rust,no_run
//! use omnirpc::{MethodSet, Network, RpcServer, Service};
//! use std::sync::Arc;
//!
//! struct Arith;
//!
//! impl Service for Arith {
//!     fn methods(self: Arc<Self>) -> MethodSet {
//!         MethodSet::new().method("Add", |(a, b): (i64, i64)| async move { Ok(a + b) })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = RpcServer::builder(Network::Tcp)
//!         .service(Arith)
//!         .with_port(9000)
//!         .build()?;
//!     server.start().await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Quick Start - Client
//!
//! ```rust,no_run
//! use omnirpc::{Network, RpcClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::new(Network::Tcp, None).with_server_addr("127.0.0.1:9000");
//!
//!     let mut sum = 0i64;
//!     client.submit("Arith.Add", &(10, 20), &mut sum).await?;
//!     println!("Result: {}", sum);
//!     Ok(())
//! }
//! ```

pub use omnirpc_client as client;
pub use omnirpc_core as core;
pub use omnirpc_server as server;
pub use omnirpc_tasks as tasks;

pub use omnirpc_client::{ClientBuilder, RpcClient};
pub use omnirpc_core::{
    codec::TcpCodec, init_observability, shutdown_observability, ConnectionProfile, Error,
    Network, ObservabilityConfig, Result,
};
pub use omnirpc_server::{
    MethodSet, RpcServer, ServerBuilder, ServerState, Service, ServiceRegistration,
};
