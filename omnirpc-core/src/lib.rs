//! Core types and codecs for omnirpc
//!
//! This crate holds everything the server and client halves share:
//!
//! - **Error handling**: The [`Error`] taxonomy, aggregated registration
//!   failures and the JSON-RPC error object
//! - **Types**: [`Network`], [`Payload`] and the HTTP JSON-RPC 2.0 envelope
//! - **Codec**: The two TCP framings and their selector
//! - **Endpoint**: Connection profiles and address resolution
//! - **Observability**: `tracing` subscriber and OTLP setup
//!
//! # Architecture
//!
//! omnirpc puts one client/server API in front of two transports. TCP
//! connections carry framed requests in one of two codecs; HTTP carries one
//! JSON-RPC 2.0 envelope per POST. The `omnirpc-server` and `omnirpc-client`
//! crates build on the types here.
//!
//! # Example
//!
//! ```rust
//! use omnirpc_core::{Id, JsonRpcRequest, Network};
//!
//! let network: Network = "http".parse().unwrap();
//! assert_eq!(network, Network::Http);
//!
//! let request = JsonRpcRequest::new("Arith.HttpAdd", &serde_json::json!({"a": 1, "b": 2}), Id::random()).unwrap();
//! assert_eq!(request.params, serde_json::json!([{"a": 1, "b": 2}]));
//! ```

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod observability;
pub mod types;

pub use codec::{ClientCodec, ServerCodec, TcpCodec, WireRequest, WireResponse};
pub use endpoint::{resolve, ConnectionProfile};
pub use error::{Error, JsonRpcErrorData, RegistrationErrors, Result};
pub use observability::{init_observability, shutdown_observability, ObservabilityConfig};
pub use types::{Id, JsonRpcRequest, JsonRpcResponse, Network, Payload, PayloadFormat};
