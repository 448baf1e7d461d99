//! TCP connection serving
//!
//! Each accepted TCP connection runs [`handle_connection`] in its own task.
//! The connection is wrapped in the configured codec and requests are served
//! one at a time, in the order they arrive, until the peer closes the stream.
//!
//! # Error Handling
//!
//! - Lookup, decode and handler failures become error responses and the
//!   connection stays open
//! - A frame that cannot be read (wrong codec, oversized, malformed) gets one
//!   error response and then the connection closes
//! - A peer vanishing mid-frame ends the connection quietly

use crate::registry::Dispatcher;
use omnirpc_core::codec::{server_codec, TcpCodec, WireResponse, NO_SEQ};
use omnirpc_core::{Error, Result};
use tokio::io::{AsyncRead, AsyncWrite};

/// Serve one TCP connection until it closes
#[tracing::instrument(skip(stream, dispatcher, codec), fields(codec = %codec))]
pub async fn handle_connection<S>(
    stream: S,
    conn_id: u64,
    codec: TcpCodec,
    dispatcher: Dispatcher,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut codec = server_codec(codec, stream);
    let format = codec.payload_format();

    loop {
        let request = match codec.read_request().await {
            Ok(Some(request)) => request,
            Ok(None) => {
                tracing::info!("Connection closed by client");
                return Ok(());
            }
            Err(Error::ConnectionClosed) => {
                tracing::warn!("Connection dropped mid-frame");
                return Ok(());
            }
            Err(e) => {
                // The stream position is unknown after a bad frame.
                let _ = codec.write_response(WireResponse::failure(NO_SEQ, &e)).await;
                return Err(e);
            }
        };

        tracing::debug!(seq = request.seq, method = %request.method, "Handling request");

        let response = match dispatcher.dispatch(&request.method, request.params).await {
            Ok(result) if result.format() == format => WireResponse::success(request.seq, result),
            Ok(_) => WireResponse::failure(
                request.seq,
                &Error::Serialization(format!(
                    "{} returned a result in the wrong encoding",
                    request.method
                )),
            ),
            Err(e) => {
                tracing::debug!(seq = request.seq, error = %e, "Request failed");
                WireResponse::failure(request.seq, &e)
            }
        };

        codec.write_response(response).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{MethodSet, Service, ServiceRegistration};
    use omnirpc_core::codec::{client_codec, WireRequest};
    use omnirpc_core::{Network, Payload};
    use std::sync::Arc;
    use tokio::io::duplex;

    struct Arith;

    impl Service for Arith {
        fn methods(self: Arc<Self>) -> MethodSet {
            MethodSet::new()
                .method("Double", |n: i64| async move { Ok(n * 2) })
                .raw("Wrong", |_| async move { Ok(Payload::Json(serde_json::json!(1))) })
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::build(Network::Tcp, vec![ServiceRegistration::new(Arith)]).unwrap()
    }

    #[tokio::test]
    async fn test_requests_served_in_order() {
        for kind in [TcpCodec::Json, TcpCodec::Binary] {
            let (client_end, server_end) = duplex(64 * 1024);
            let server = tokio::spawn(handle_connection(server_end, 1, kind, dispatcher()));
            let mut client = client_codec(kind, client_end);

            for n in 1..=3i64 {
                client
                    .write_request(&WireRequest {
                        seq: n as u64,
                        method: "Arith.Double".to_string(),
                        params: Payload::encode(kind.payload_format(), &n).unwrap(),
                    })
                    .await
                    .unwrap();
            }
            for n in 1..=3i64 {
                let response = client.read_response().await.unwrap();
                assert_eq!(response.seq, n as u64);
                assert_eq!(response.result.unwrap().decode::<i64>().unwrap(), n * 2);
            }

            drop(client);
            assert!(server.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_unknown_method_keeps_connection_open() {
        let (client_end, server_end) = duplex(64 * 1024);
        tokio::spawn(handle_connection(server_end, 2, TcpCodec::Json, dispatcher()));
        let mut client = client_codec(TcpCodec::Json, client_end);

        for (seq, method) in [(1, "Arith.Nope"), (2, "Arith.Double")] {
            client
                .write_request(&WireRequest {
                    seq,
                    method: method.to_string(),
                    params: Payload::Json(serde_json::json!(4)),
                })
                .await
                .unwrap();
        }

        let first = client.read_response().await.unwrap();
        assert!(matches!(
            first.error.unwrap().into_error(),
            Error::MethodNotFound(msg) if msg == "rpc: can't find method Arith.Nope"
        ));
        let second = client.read_response().await.unwrap();
        assert_eq!(second.result.unwrap().decode::<i64>().unwrap(), 8);
    }

    #[tokio::test]
    async fn test_wrong_result_encoding_is_reported() {
        let (client_end, server_end) = duplex(64 * 1024);
        tokio::spawn(handle_connection(server_end, 3, TcpCodec::Binary, dispatcher()));
        let mut client = client_codec(TcpCodec::Binary, client_end);

        client
            .write_request(&WireRequest {
                seq: 1,
                method: "Arith.Wrong".to_string(),
                params: Payload::encode(TcpCodec::Binary.payload_format(), &0i64).unwrap(),
            })
            .await
            .unwrap();
        let response = client.read_response().await.unwrap();
        assert!(response.error.unwrap().message.contains("wrong encoding"));
    }

    #[tokio::test]
    async fn test_foreign_codec_closes_with_error() {
        let (client_end, server_end) = duplex(64 * 1024);
        let server = tokio::spawn(handle_connection(server_end, 4, TcpCodec::Json, dispatcher()));
        let mut client = client_codec(TcpCodec::Binary, client_end);

        client
            .write_request(&WireRequest {
                seq: 1,
                method: "Arith.Double".to_string(),
                params: Payload::encode(TcpCodec::Binary.payload_format(), &1i64).unwrap(),
            })
            .await
            .unwrap();

        assert!(matches!(server.await.unwrap(), Err(Error::Decode(_))));
    }
}
