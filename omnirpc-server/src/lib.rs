//! RPC server over TCP or HTTP
//!
//! One [`RpcServer`] serves a set of registered services over one transport:
//!
//! - **TCP**: persistent connections carrying framed requests in the
//!   configured codec (line-delimited JSON by default, MessagePack as the
//!   alternate)
//! - **HTTP**: one JSON-RPC 2.0 envelope per `POST` to a fixed path
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use omnirpc_core::Network;
//! use omnirpc_server::{MethodSet, RpcServer, Service, ServiceRegistration};
//! use serde::{Deserialize, Serialize};
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct Args { a: i64, b: i64 }
//!
//! #[derive(Serialize)]
//! struct Sum { value: i64 }
//!
//! struct Arith;
//!
//! impl Service for Arith {
//!     fn methods(self: Arc<Self>) -> MethodSet {
//!         MethodSet::new()
//!             .method("Add", |args: Args| async move { Ok(args.a + args.b) })
//!             .method("HttpAdd", |args: Args| async move { Ok(Sum { value: args.a + args.b }) })
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = RpcServer::new(Network::Tcp, vec![ServiceRegistration::new(Arith)])?;
//!     let addr = server.start().await?;
//!     println!("serving on {}", addr);
//!
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Accept task**: owns the listener and accepts connections until shutdown
//! - **Connection tasks**: one per accepted connection; a TCP connection
//!   serves its requests in arrival order
//! - **Dispatch table**: built once, shared read-only by every connection
//!
//! Shutdown stops the accept task and closes the listener. Connections
//! already being served are not drained.

mod builder;
mod connection;
mod handler;
mod http;
mod registry;
mod service;

pub use builder::ServerBuilder;
pub use handler::{from_fn, from_typed_fn, AsyncMethod, Method, MethodFuture};
pub use http::handle_request as handle_http_request;
pub use registry::{Dispatcher, Registry};
pub use service::{MethodSet, Service, ServiceRegistration};

use omnirpc_core::codec::TcpCodec;
use omnirpc_core::{resolve, ConnectionProfile, Error, Network, Result};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Lifecycle state of an [`RpcServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Unstarted,
    Listening,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Unstarted => "unstarted",
            ServerState::Listening => "listening",
            ServerState::ShuttingDown => "shutting down",
            ServerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Listener and transport settings collected by [`ServerBuilder`]
#[derive(Debug, Default)]
pub(crate) struct ServerConfig {
    pub(crate) port: u16,
    pub(crate) listener: Option<TcpListener>,
    pub(crate) http_path: Option<String>,
    pub(crate) tcp_codec: TcpCodec,
    pub(crate) profile: Option<ConnectionProfile>,
    pub(crate) max_connections: Option<usize>,
}

/// RPC server for one transport
///
/// # Lifecycle
///
/// 1. **Build**: [`RpcServer::new`] or [`RpcServer::builder`] validates the
///    registrations and builds the dispatch table
/// 2. **Start**: [`RpcServer::start`] binds, spawns the accept task and
///    returns the local address
/// 3. **Shutdown**: [`RpcServer::shutdown`] stops accepting and closes the
///    listener; dropping a running server does the same without waiting
pub struct RpcServer {
    dispatcher: Dispatcher,
    config: ServerConfig,
    state: ServerState,
    local_addr: Option<SocketAddr>,
    http_path: Option<String>,
    shutdown_tx: Option<watch::Sender<bool>>,
    accept_task: Option<JoinHandle<()>>,
}

impl RpcServer {
    /// Create a server with default settings
    ///
    /// Binds `0.0.0.0` on a free port when started; use [`RpcServer::builder`]
    /// for anything else.
    pub fn new(network: Network, registrations: Vec<ServiceRegistration>) -> Result<Self> {
        ServerBuilder::new(network).registrations(registrations).build()
    }

    pub fn builder(network: Network) -> ServerBuilder {
        ServerBuilder::new(network)
    }

    pub(crate) fn from_parts(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            dispatcher,
            config,
            state: ServerState::Unstarted,
            local_addr: None,
            http_path: None,
            shutdown_tx: None,
            accept_task: None,
        }
    }

    /// Bind and start accepting connections
    ///
    /// Returns the address actually bound, which matters when port 0 was
    /// requested.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] when the server was already started or stopped
    /// - [`Error::Transport`] when binding fails
    #[tracing::instrument(skip(self), name = "server.start", fields(network = %self.network()))]
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if self.state != ServerState::Unstarted {
            return Err(Error::Configuration(format!(
                "server cannot start while {}",
                self.state
            )));
        }

        let listener = match self.config.listener.take() {
            Some(listener) => listener,
            None => {
                let fallback = format!("0.0.0.0:{}", self.config.port);
                let addr = resolve(self.config.profile.as_ref(), &fallback)?;
                TcpListener::bind(&addr)
                    .await
                    .map_err(|e| Error::Transport(format!("failed to bind {}: {}", addr, e)))?
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::Transport(format!("failed to read local address: {}", e)))?;

        let network = self.network();
        let path: Arc<str> = match network {
            Network::Http => {
                let path = normalize_http_path(self.config.http_path.as_deref());
                self.http_path = Some(path.clone());
                Arc::from(path)
            }
            Network::Tcp => Arc::from(""),
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept = AcceptLoop {
            listener,
            network,
            dispatcher: self.dispatcher.clone(),
            tcp_codec: self.config.tcp_codec,
            http_path: path,
            limit: self.config.max_connections.map(|n| Arc::new(Semaphore::new(n))),
        };
        self.accept_task = Some(tokio::spawn(accept.run(shutdown_rx)));
        self.shutdown_tx = Some(shutdown_tx);
        self.local_addr = Some(local_addr);
        self.state = ServerState::Listening;

        match network {
            Network::Http => tracing::info!(
                addr = %local_addr,
                path = self.http_path.as_deref().unwrap_or_default(),
                "HTTP server listening"
            ),
            Network::Tcp => tracing::info!(
                addr = %local_addr,
                codec = %self.config.tcp_codec,
                "TCP server listening"
            ),
        }
        Ok(local_addr)
    }

    /// Stop accepting connections and close the listener
    ///
    /// Waits for the accept task to finish. Connections already being served
    /// keep running until their peers disconnect. Calling this on an unstarted
    /// server marks it stopped; calling it again does nothing.
    #[tracing::instrument(skip(self), name = "server.shutdown")]
    pub async fn shutdown(&mut self) {
        match self.state {
            ServerState::Stopped | ServerState::ShuttingDown => return,
            ServerState::Unstarted => {
                self.state = ServerState::Stopped;
                return;
            }
            ServerState::Listening => {}
        }

        self.state = ServerState::ShuttingDown;
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Accept task failed");
            }
        }
        self.state = ServerState::Stopped;
        tracing::info!("Server stopped");
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Bound address, once started
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Path served in HTTP mode, once started
    pub fn http_path(&self) -> Option<&str> {
        self.http_path.as_deref()
    }

    pub fn network(&self) -> Network {
        self.dispatcher.network()
    }

    pub fn tcp_codec(&self) -> TcpCodec {
        self.config.tcp_codec
    }

    /// Every registered `"Service.Method"`, sorted
    pub fn methods(&self) -> Vec<String> {
        self.dispatcher.methods()
    }
}

impl Drop for RpcServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
    }
}

/// `/`-prefixed HTTP path, or a random `/<uuid>` when none is configured
fn normalize_http_path(configured: Option<&str>) -> String {
    match configured.map(str::trim) {
        Some(path) if !path.is_empty() => {
            if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{}", path)
            }
        }
        _ => format!("/{}", uuid::Uuid::new_v4()),
    }
}

/// State owned by the accept task
struct AcceptLoop {
    listener: TcpListener,
    network: Network,
    dispatcher: Dispatcher,
    tcp_codec: TcpCodec,
    http_path: Arc<str>,
    limit: Option<Arc<Semaphore>>,
}

impl AcceptLoop {
    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut conn_counter: u64 = 0;

        loop {
            let permit = match &self.limit {
                Some(limit) => tokio::select! {
                    permit = Arc::clone(limit).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                    _ = shutdown.changed() => break,
                },
                None => None,
            };

            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown.changed() => break,
            };

            let (stream, addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            conn_counter += 1;
            let conn_id = conn_counter;
            tracing::info!(conn_id = conn_id, addr = %addr, "New connection accepted");

            let dispatcher = self.dispatcher.clone();
            match self.network {
                Network::Tcp => {
                    let codec = self.tcp_codec;
                    tokio::spawn(async move {
                        if let Err(e) =
                            connection::handle_connection(stream, conn_id, codec, dispatcher).await
                        {
                            tracing::error!(conn_id = conn_id, error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
                Network::Http => {
                    let path = Arc::clone(&self.http_path);
                    tokio::spawn(async move {
                        if let Err(e) = http::handle_connection(stream, conn_id, dispatcher, path).await {
                            tracing::error!(conn_id = conn_id, error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
            }
        }

        tracing::info!("Accept loop stopped");
    }
}
