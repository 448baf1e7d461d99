//! Client builder
//!
//! The `ClientBuilder` collects transport settings before creating an
//! [`RpcClient`]. It allows you to:
//! - Pick the server address directly or through a [`ConnectionProfile`]
//! - Choose the TCP codec
//! - Set the HTTP path, or supply a preconfigured `reqwest::Client`
//!
//! # Examples
//!
//! ```rust
//! use omnirpc_client::ClientBuilder;
//! use omnirpc_core::{codec::TcpCodec, Network};
//!
//! let client = ClientBuilder::new(Network::Tcp)
//!     .server_addr("127.0.0.1:9000")
//!     .tcp_codec(TcpCodec::Binary)
//!     .build();
//! assert_eq!(client.tcp_codec(), TcpCodec::Binary);
//! ```

use crate::RpcClient;
use omnirpc_core::codec::TcpCodec;
use omnirpc_core::{ConnectionProfile, Network};

/// Builder for configuring and creating an [`RpcClient`]
pub struct ClientBuilder {
    network: Network,
    server_addr: Option<String>,
    http_path: Option<String>,
    tcp_codec: TcpCodec,
    profile: Option<ConnectionProfile>,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            server_addr: None,
            http_path: None,
            tcp_codec: TcpCodec::default(),
            profile: None,
            http_client: None,
        }
    }

    /// `host:port` of the server
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.server_addr = Some(addr.into());
        self
    }

    /// URL path of the HTTP endpoint
    pub fn http_path(mut self, path: impl Into<String>) -> Self {
        self.http_path = Some(path.into());
        self
    }

    pub fn tcp_codec(mut self, codec: TcpCodec) -> Self {
        self.tcp_codec = codec;
        self
    }

    /// Connection profile; its host and port win over `server_addr`
    pub fn profile(mut self, profile: ConnectionProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Use this HTTP client (timeouts, proxies, TLS) instead of a default one
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> RpcClient {
        let mut client = RpcClient::new(self.network, self.profile).with_tcp_codec(self.tcp_codec);
        if let Some(addr) = self.server_addr {
            client = client.with_server_addr(addr);
        }
        if let Some(path) = self.http_path {
            client = client.with_http_path(path);
        }
        if let Some(http) = self.http_client {
            client.http = http;
        }
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = ClientBuilder::new(Network::Http).build();
        assert_eq!(client.network(), Network::Http);
        assert_eq!(client.server_addr(), "");
        assert_eq!(client.http_path(), "");
        assert_eq!(client.tcp_codec(), TcpCodec::Json);
        assert!(client.profile().is_none());
    }

    #[test]
    fn test_builder_sets_everything() {
        let client = RpcClient::builder(Network::Http)
            .server_addr(" 127.0.0.1:8080 ")
            .http_path("/rpc")
            .profile(ConnectionProfile::new("10.0.0.1", 80))
            .http_client(reqwest::Client::new())
            .build();
        assert_eq!(client.server_addr(), "127.0.0.1:8080");
        assert_eq!(client.http_path(), "/rpc");
        assert_eq!(client.profile().map(|p| p.address()).as_deref(), Some("10.0.0.1:80"));
    }
}
