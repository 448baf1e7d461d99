//! Codec selection for TCP connections
//!
//! A TCP connection carries one of two framings, chosen by [`TcpCodec`]:
//!
//! - **Json** (the default): one JSON object per line, with the canonical
//!   RPC-over-JSON fields (`method`/`params`/`id` out, `id`/`result`/`error` back)
//! - **Binary** (the alternate): length-prefixed MessagePack frames
//!
//! The two are not wire-compatible. Client and server must pick the same one
//! out of band; reading the other framing fails with [`Error::Decode`]
//! instead of misdecoding.
//!
//! # Connection-Scoped Codecs
//!
//! [`server_codec`] and [`client_codec`] wrap a connected stream and return a
//! boxed codec that reads and writes whole messages. The server side reads
//! [`WireRequest`]s and writes [`WireResponse`]s; the client side does the
//! opposite.
//!
//! # Examples
//!
//! ```rust
//! use omnirpc_core::codec::TcpCodec;
//!
//! assert_eq!(TcpCodec::from_name("binary"), TcpCodec::Binary);
//! assert_eq!(TcpCodec::from_name(""), TcpCodec::Json);
//! assert_eq!(TcpCodec::from_name("no-such-codec"), TcpCodec::Json);
//! ```

mod binary;
mod json;

pub use binary::{BinaryClientCodec, BinaryServerCodec};
pub use json::{JsonClientCodec, JsonServerCodec};

use crate::error::{Error, Result};
use crate::types::{Payload, PayloadFormat};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};

/// Largest frame either codec will read (16 MiB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Sequence number used on responses to requests that could not be read
pub const NO_SEQ: u64 = 0;

/// Framing used on a TCP connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TcpCodec {
    /// Line-delimited JSON
    #[default]
    Json,
    /// Length-prefixed MessagePack
    Binary,
}

impl TcpCodec {
    /// Resolve a codec identifier
    ///
    /// Unknown and empty identifiers resolve to the default JSON codec.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "alternate" | "binary" | "msgpack" => TcpCodec::Binary,
            _ => TcpCodec::Json,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TcpCodec::Json => "json",
            TcpCodec::Binary => "binary",
        }
    }

    /// Payload encoding used by this codec
    pub fn payload_format(&self) -> PayloadFormat {
        match self {
            TcpCodec::Json => PayloadFormat::Json,
            TcpCodec::Binary => PayloadFormat::Binary,
        }
    }
}

impl fmt::Display for TcpCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One call as it travels over a TCP connection
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// Connection-local sequence number pairing a response with its request
    pub seq: u64,
    /// `Service.Method`
    pub method: String,
    /// The single argument
    pub params: Payload,
}

/// Which error a failed response stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireErrorKind {
    MethodNotFound,
    InvalidParams,
    Handler,
}

/// The failure half of a [`WireResponse`]
#[derive(Debug, Clone, PartialEq)]
pub struct WireError {
    /// `None` when the peer sent only a message
    pub kind: Option<WireErrorKind>,
    /// See [`Error::to_wire_message`]
    pub message: String,
}

impl WireError {
    pub fn from_error(error: &Error) -> Self {
        let kind = match error {
            Error::MethodNotFound(_) => WireErrorKind::MethodNotFound,
            Error::Decode(_) => WireErrorKind::InvalidParams,
            _ => WireErrorKind::Handler,
        };
        Self {
            kind: Some(kind),
            message: error.to_wire_message(),
        }
    }

    /// An error received without a kind
    pub fn untyped(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
        }
    }

    /// Rebuild the caller-facing error
    ///
    /// The kind wins over the message text; untyped errors are classified by
    /// [`Error::from_wire_message`].
    pub fn into_error(self) -> Error {
        match self.kind {
            Some(WireErrorKind::MethodNotFound) => Error::MethodNotFound(self.message),
            Some(WireErrorKind::InvalidParams) => Error::Decode(self.message),
            Some(WireErrorKind::Handler) => Error::Handler(self.message),
            None => Error::from_wire_message(self.message),
        }
    }
}

/// The answer to one [`WireRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub seq: u64,
    /// Present on success
    pub result: Option<Payload>,
    /// Present on failure
    pub error: Option<WireError>,
}

impl WireResponse {
    pub fn success(seq: u64, result: Payload) -> Self {
        Self {
            seq,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(seq: u64, error: &Error) -> Self {
        Self {
            seq,
            result: None,
            error: Some(WireError::from_error(error)),
        }
    }
}

/// Server half of a connection-scoped codec
#[async_trait]
pub trait ServerCodec: Send {
    /// Read the next request; `Ok(None)` on a clean end of stream
    async fn read_request(&mut self) -> Result<Option<WireRequest>>;

    /// Write the response for a request previously read
    async fn write_response(&mut self, response: WireResponse) -> Result<()>;

    /// Payload encoding handlers must use on this connection
    fn payload_format(&self) -> PayloadFormat;
}

/// Client half of a connection-scoped codec
#[async_trait]
pub trait ClientCodec: Send {
    async fn write_request(&mut self, request: &WireRequest) -> Result<()>;

    /// Read the next response; a closed stream is [`Error::ConnectionClosed`]
    async fn read_response(&mut self) -> Result<WireResponse>;

    fn payload_format(&self) -> PayloadFormat;
}

/// Wrap an accepted connection in the server codec for `kind`
pub fn server_codec<S>(kind: TcpCodec, stream: S) -> Box<dyn ServerCodec>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match kind {
        TcpCodec::Json => Box::new(JsonServerCodec::new(stream)),
        TcpCodec::Binary => Box::new(BinaryServerCodec::new(stream)),
    }
}

/// Wrap a dialled connection in the client codec for `kind`
pub fn client_codec<S>(kind: TcpCodec, stream: S) -> Box<dyn ClientCodec>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match kind {
        TcpCodec::Json => Box::new(JsonClientCodec::new(stream)),
        TcpCodec::Binary => Box::new(BinaryClientCodec::new(stream)),
    }
}

pub(crate) fn io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe => Error::ConnectionClosed,
        _ => Error::Transport(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tokio::io::duplex;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Args {
        a: i32,
        b: i32,
    }

    fn request(kind: TcpCodec) -> WireRequest {
        WireRequest {
            seq: 1,
            method: "Arith.Add".to_string(),
            params: Payload::encode(kind.payload_format(), &Args { a: 10, b: 20 }).unwrap(),
        }
    }

    #[test]
    fn test_codec_names() {
        assert_eq!(TcpCodec::from_name("default"), TcpCodec::Json);
        assert_eq!(TcpCodec::from_name("JSON"), TcpCodec::Json);
        assert_eq!(TcpCodec::from_name("alternate"), TcpCodec::Binary);
        assert_eq!(TcpCodec::from_name(" MsgPack "), TcpCodec::Binary);
        assert_eq!(TcpCodec::default(), TcpCodec::Json);
        assert_eq!(TcpCodec::Binary.to_string(), "binary");
    }

    #[tokio::test]
    async fn test_request_crosses_each_codec_intact() {
        for kind in [TcpCodec::Json, TcpCodec::Binary] {
            let (client_end, server_end) = duplex(64 * 1024);
            let mut client = client_codec(kind, client_end);
            let mut server = server_codec(kind, server_end);

            client.write_request(&request(kind)).await.unwrap();
            let received = server.read_request().await.unwrap().unwrap();

            assert_eq!(received.method, "Arith.Add");
            assert_eq!(received.params.format(), kind.payload_format());
            assert_eq!(received.params.decode::<Args>().unwrap(), Args { a: 10, b: 20 });

            let result = Payload::encode(server.payload_format(), &30).unwrap();
            server
                .write_response(WireResponse::success(received.seq, result))
                .await
                .unwrap();

            let response = client.read_response().await.unwrap();
            assert_eq!(response.seq, 1);
            assert!(response.error.is_none());
            assert_eq!(response.result.unwrap().decode::<i32>().unwrap(), 30);
        }
    }

    #[tokio::test]
    async fn test_binary_request_is_not_decodable_as_json() {
        let (client_end, server_end) = duplex(64 * 1024);
        let mut client = client_codec(TcpCodec::Binary, client_end);
        let mut server = server_codec(TcpCodec::Json, server_end);

        client.write_request(&request(TcpCodec::Binary)).await.unwrap();
        assert!(matches!(server.read_request().await, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_json_request_is_not_decodable_as_binary() {
        let (client_end, server_end) = duplex(64 * 1024);
        let mut client = client_codec(TcpCodec::Json, client_end);
        let mut server = server_codec(TcpCodec::Binary, server_end);

        client.write_request(&request(TcpCodec::Json)).await.unwrap();
        assert!(matches!(server.read_request().await, Err(Error::Decode(_))));
    }

    #[tokio::test]
    async fn test_clean_close_reads_none() {
        for kind in [TcpCodec::Json, TcpCodec::Binary] {
            let (client_end, server_end) = duplex(1024);
            drop(client_end);
            let mut server = server_codec(kind, server_end);
            assert!(server.read_request().await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_client_sees_closed_connection() {
        for kind in [TcpCodec::Json, TcpCodec::Binary] {
            let (client_end, server_end) = duplex(1024);
            drop(server_end);
            let mut client = client_codec(kind, client_end);
            assert!(matches!(client.read_response().await, Err(Error::ConnectionClosed)));
        }
    }

    #[tokio::test]
    async fn test_failure_response_carries_wire_message() {
        for kind in [TcpCodec::Json, TcpCodec::Binary] {
            let (client_end, server_end) = duplex(64 * 1024);
            let mut client = client_codec(kind, client_end);
            let mut server = server_codec(kind, server_end);

            client.write_request(&request(kind)).await.unwrap();
            let received = server.read_request().await.unwrap().unwrap();
            let error = Error::MethodNotFound("rpc: can't find method Arith.Add".to_string());
            server
                .write_response(WireResponse::failure(received.seq, &error))
                .await
                .unwrap();

            let response = client.read_response().await.unwrap();
            assert!(response.result.is_none());
            let wire = response.error.unwrap();
            assert_eq!(wire.kind, Some(WireErrorKind::MethodNotFound));
            assert_eq!(wire.message, "rpc: can't find method Arith.Add");
        }
    }

    #[tokio::test]
    async fn test_error_kind_survives_each_codec() {
        let cases = [
            Error::handler("rpc: can't find the user record"),
            Error::handler("rpc: invalid params are my own words"),
            Error::MethodNotFound("rpc: can't find service Geo.Area".to_string()),
            Error::Decode("expected i64".to_string()),
        ];
        for kind in [TcpCodec::Json, TcpCodec::Binary] {
            let (client_end, server_end) = duplex(64 * 1024);
            let mut client = client_codec(kind, client_end);
            let mut server = server_codec(kind, server_end);

            for error in &cases {
                client.write_request(&request(kind)).await.unwrap();
                let received = server.read_request().await.unwrap().unwrap();
                server
                    .write_response(WireResponse::failure(received.seq, error))
                    .await
                    .unwrap();

                let rebuilt = client.read_response().await.unwrap().error.unwrap().into_error();
                match (error, &rebuilt) {
                    (Error::Handler(sent), Error::Handler(got)) => assert_eq!(sent, got),
                    (Error::MethodNotFound(sent), Error::MethodNotFound(got)) => {
                        assert_eq!(sent, got)
                    }
                    (Error::Decode(_), Error::Decode(got)) => {
                        assert_eq!(got, "rpc: invalid params: expected i64")
                    }
                    _ => panic!("codec {}: {:?} came back as {:?}", kind, error, rebuilt),
                }
            }
        }
    }

    #[test]
    fn test_untyped_error_falls_back_to_prefix() {
        assert!(matches!(
            WireError::untyped("rpc: can't find method A.B").into_error(),
            Error::MethodNotFound(_)
        ));
        assert!(matches!(
            WireError::untyped("disk full").into_error(),
            Error::Handler(_)
        ));
    }
}
