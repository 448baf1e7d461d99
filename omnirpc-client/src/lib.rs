//! omnirpc client
//!
//! One client type talks to an omnirpc server over either transport:
//!
//! - **TCP**: one short-lived connection per call, framed by the JSON or the
//!   binary codec (it must match the server's)
//! - **HTTP**: one JSON-RPC 2.0 POST per call; arguments and results must be
//!   structs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use omnirpc_client::RpcClient;
//! use omnirpc_core::Network;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RpcClient::new(Network::Tcp, None).with_server_addr("127.0.0.1:9000");
//!
//!     let mut sum = 0i64;
//!     client.submit("Arith.Add", &(10, 20), &mut sum).await?;
//!     println!("10 + 20 = {}", sum);
//!
//!     Ok(())
//! }
//! ```

mod client;
mod client_builder;
mod shape;

pub use client::RpcClient;
pub use client_builder::ClientBuilder;
pub use shape::{type_shape_error, value_shape_error};

pub use omnirpc_core::{codec::TcpCodec, ConnectionProfile, Error, Network, Result};
