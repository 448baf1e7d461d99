//! RPC client implementation
//!
//! [`RpcClient`] makes one synchronous call per [`RpcClient::submit`]:
//!
//! - **TCP**: dial, send one framed request in the configured codec, read one
//!   response, close the connection
//! - **HTTP**: POST one JSON-RPC 2.0 envelope to `http://<addr><path>`
//!
//! The client keeps no per-call state, so one instance can be shared by any
//! number of concurrent callers.

use crate::shape::{type_shape_error, value_shape_error};
use crate::ClientBuilder;
use omnirpc_core::codec::{client_codec, TcpCodec, WireRequest};
use omnirpc_core::{
    resolve, ConnectionProfile, Error, Id, JsonRpcRequest, JsonRpcResponse, Network, Payload,
    Result,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::TcpStream;

/// Sequence number of the single request sent on each TCP connection
const CALL_SEQ: u64 = 1;

/// RPC client for one transport
///
/// # Examples
///
/// ```rust,no_run
/// use omnirpc_client::RpcClient;
/// use omnirpc_core::Network;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize)]
/// struct Args { a: i64, b: i64 }
///
/// #[derive(Deserialize, Default)]
/// struct Sum { value: i64 }
///
/// # async fn example() -> omnirpc_core::Result<()> {
/// let tcp = RpcClient::new(Network::Tcp, None).with_server_addr("127.0.0.1:9000");
/// let mut reply = 0i64;
/// tcp.submit("Arith.Add", &Args { a: 10, b: 20 }, &mut reply).await?;
/// assert_eq!(reply, 30);
///
/// let http = RpcClient::new(Network::Http, None)
///     .with_server_addr("127.0.0.1:8080")
///     .with_http_path("/rpc");
/// let mut sum = Sum::default();
/// http.submit("Arith.HttpAdd", &Args { a: 10, b: 20 }, &mut sum).await?;
/// assert_eq!(sum.value, 30);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RpcClient {
    pub(crate) network: Network,
    pub(crate) server_addr: String,
    pub(crate) http_path: String,
    pub(crate) tcp_codec: TcpCodec,
    pub(crate) profile: Option<ConnectionProfile>,
    pub(crate) http: reqwest::Client,
}

impl RpcClient {
    /// Create a client; a profile with a host overrides any server address
    pub fn new(network: Network, profile: Option<ConnectionProfile>) -> Self {
        Self {
            network,
            server_addr: String::new(),
            http_path: String::new(),
            tcp_codec: TcpCodec::default(),
            profile,
            http: reqwest::Client::new(),
        }
    }

    pub fn builder(network: Network) -> ClientBuilder {
        ClientBuilder::new(network)
    }

    /// Set the `host:port` to call; an empty address leaves the current one
    pub fn with_server_addr(mut self, addr: impl Into<String>) -> Self {
        let addr = addr.into();
        if !addr.trim().is_empty() {
            self.server_addr = addr.trim().to_string();
        }
        self
    }

    /// Set the URL path used in HTTP mode
    pub fn with_http_path(mut self, path: impl Into<String>) -> Self {
        self.http_path = path.into().trim().to_string();
        self
    }

    /// Set the TCP codec; it must match the server's
    pub fn with_tcp_codec(mut self, codec: TcpCodec) -> Self {
        self.tcp_codec = codec;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn http_path(&self) -> &str {
        &self.http_path
    }

    pub fn tcp_codec(&self) -> TcpCodec {
        self.tcp_codec
    }

    pub fn profile(&self) -> Option<&ConnectionProfile> {
        self.profile.as_ref()
    }

    /// Call `method` with `args` and store the result in `reply`
    ///
    /// `reply` is only written after the whole call succeeded; on any error it
    /// keeps its previous value.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`]: no address (or, for HTTP, no path)
    /// - [`Error::InvalidArgument`]: HTTP call whose `args` or `R` is not a struct
    /// - [`Error::Dial`]: the server could not be reached
    /// - [`Error::Transport`], [`Error::ConnectionClosed`]: the exchange broke off
    /// - [`Error::Decode`]: malformed response or a codec mismatch
    /// - [`Error::MethodNotFound`], [`Error::Handler`]: the server rejected the call (TCP)
    /// - [`Error::Remote`]: the envelope carried an error object (HTTP)
    #[tracing::instrument(skip(self, args, reply), name = "client.submit", fields(network = %self.network))]
    pub async fn submit<A, R>(&self, method: &str, args: &A, reply: &mut R) -> Result<()>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        *reply = self.call(method, args).await?;
        Ok(())
    }

    /// Call `method` with `args` and return the result
    pub async fn call<A, R>(&self, method: &str, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        match self.network {
            Network::Tcp => self.call_tcp(method, args).await,
            Network::Http => self.call_http(method, args).await,
        }
    }

    async fn call_tcp<A, R>(&self, method: &str, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let addr = resolve(self.profile.as_ref(), &self.server_addr)?;
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::Dial(format!("{}: {}", addr, e)))?;
        let mut codec = client_codec(self.tcp_codec, stream);

        let request = WireRequest {
            seq: CALL_SEQ,
            method: method.to_string(),
            params: Payload::encode(codec.payload_format(), args)?,
        };
        tracing::debug!(addr = %addr, method = %method, codec = %self.tcp_codec, "Sending request");
        codec.write_request(&request).await?;

        let response = codec.read_response().await?;
        if let Some(error) = response.error {
            return Err(error.into_error());
        }
        if response.seq != CALL_SEQ {
            return Err(Error::Decode("response id mismatch".to_string()));
        }
        response
            .result
            .ok_or_else(|| Error::Decode("response carries neither result nor error".to_string()))?
            .decode()
    }

    async fn call_http<A, R>(&self, method: &str, args: &A) -> Result<R>
    where
        A: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if let Some(kind) = value_shape_error(args) {
            return Err(Error::InvalidArgument(format!(
                "args must be a struct, got {}",
                kind
            )));
        }
        if let Some(kind) = type_shape_error::<R>() {
            return Err(Error::InvalidArgument(format!(
                "reply must be a struct, got {}",
                kind
            )));
        }

        let url = self.http_url()?;
        let request = JsonRpcRequest::new(method, args, Id::random())?;
        tracing::debug!(url = %url, method = %method, id = %request.id, "Sending request");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::Dial(format!("{}: {}", url, e))
                } else {
                    Error::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("{} returned HTTP {}", url, status)));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let envelope: JsonRpcResponse =
            serde_json::from_slice(&body).map_err(|e| Error::Decode(e.to_string()))?;
        if envelope.is_error() {
            return Err(Error::Remote(envelope.error.unwrap_or_default()));
        }
        serde_json::from_value(envelope.result.unwrap_or_default())
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// `http://<addr><path>`; the address may already carry a scheme
    fn http_url(&self) -> Result<String> {
        let empty = || Error::Configuration("server address or http path is empty".to_string());
        let addr = resolve(self.profile.as_ref(), &self.server_addr).map_err(|_| empty())?;
        if self.http_path.is_empty() {
            return Err(empty());
        }

        let base = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", addr)
        };
        if self.http_path.starts_with('/') {
            Ok(format!("{}{}", base, self.http_path))
        } else {
            Ok(format!("{}/{}", base, self.http_path))
        }
    }
}
