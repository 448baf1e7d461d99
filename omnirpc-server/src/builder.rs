//! Server builder
//!
//! The builder collects services and listener settings, builds the dispatch
//! table and returns an unstarted [`RpcServer`]. Registration problems are
//! reported by [`ServerBuilder::build`], before anything is bound.
//!
//! # Examples
//!
//! ```rust,no_run
//! use omnirpc_core::{codec::TcpCodec, Network};
//! use omnirpc_server::{MethodSet, RpcServer, Service};
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
//! # async fn example() -> omnirpc_core::Result<()> {
//! let mut server = RpcServer::builder(Network::Tcp)
//!     .service(Arith)
//!     .with_port(9000)
//!     .with_tcp_codec(TcpCodec::Binary)
//!     .max_connections(512)
//!     .build()?;
//!
//! let addr = server.start().await?;
//! println!("listening on {}", addr);
//! # Ok(())
//! # }
//! ```

use crate::registry::Dispatcher;
use crate::service::{Service, ServiceRegistration};
use crate::{RpcServer, ServerConfig};
use omnirpc_core::codec::TcpCodec;
use omnirpc_core::{ConnectionProfile, Network, Result};
use tokio::net::TcpListener;

/// Builder for an [`RpcServer`]
pub struct ServerBuilder {
    network: Network,
    registrations: Vec<ServiceRegistration>,
    config: ServerConfig,
}

impl ServerBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            registrations: Vec::new(),
            config: ServerConfig::default(),
        }
    }

    /// Add a registration as given
    pub fn register(mut self, registration: ServiceRegistration) -> Self {
        self.registrations.push(registration);
        self
    }

    /// Add a service under its own name
    pub fn service<S: Service>(self, service: S) -> Self {
        self.register(ServiceRegistration::new(service))
    }

    /// Add a service under an explicit name
    pub fn named_service<S: Service>(self, name: impl Into<String>, service: S) -> Self {
        self.register(ServiceRegistration::named(name, service))
    }

    /// Add several registrations
    pub fn registrations(mut self, registrations: impl IntoIterator<Item = ServiceRegistration>) -> Self {
        self.registrations.extend(registrations);
        self
    }

    /// Port to bind when no listener or profile is given (0 = any free port)
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Serve on an already bound listener
    pub fn with_listener(mut self, listener: TcpListener) -> Self {
        self.config.listener = Some(listener);
        self
    }

    pub fn with_tcp_codec(mut self, codec: TcpCodec) -> Self {
        self.config.tcp_codec = codec;
        self
    }

    /// URL path served in HTTP mode
    ///
    /// A missing leading `/` is added at start; an empty path means a random
    /// one is generated.
    pub fn with_http_path(mut self, path: impl Into<String>) -> Self {
        self.config.http_path = Some(path.into());
        self
    }

    /// Bind to the profile's host and port instead of `0.0.0.0:<port>`
    pub fn with_profile(mut self, profile: ConnectionProfile) -> Self {
        self.config.profile = Some(profile);
        self
    }

    /// Limit concurrently served connections (0 = unbounded)
    pub fn max_connections(mut self, limit: usize) -> Self {
        self.config.max_connections = (limit > 0).then_some(limit);
        self
    }

    /// Build the dispatch table and return an unstarted server
    ///
    /// # Errors
    ///
    /// [`omnirpc_core::Error::Registration`] listing every rejected registration.
    pub fn build(self) -> Result<RpcServer> {
        let dispatcher = Dispatcher::build(self.network, self.registrations)?;
        Ok(RpcServer::from_parts(dispatcher, self.config))
    }
}
