//! HTTP JSON-RPC 2.0 dispatcher
//!
//! Each accepted connection is driven by hyper's HTTP/1 connection handler.
//! Requests are routed as follows:
//!
//! - Only the configured path is served; anything else is `404`
//! - Only `POST` is accepted; other methods are `405`
//! - The body must be declared `application/json`; otherwise `415`
//!
//! Everything past those checks is answered with `200` and a JSON-RPC
//! envelope, whether the call succeeded or not. Handler errors travel in the
//! envelope's `error` field:
//!
//! ```json
//! {"jsonrpc": "2.0", "result": null, "error": {"code": -32000, "message": "boom"}, "id": "6f1c..."}
//! ```

use crate::registry::Dispatcher;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use omnirpc_core::{Error, Id, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, Payload, Result};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpStream;

/// Serve one HTTP connection until the client closes it
#[tracing::instrument(skip(stream, dispatcher, path))]
pub async fn handle_connection(
    stream: TcpStream,
    conn_id: u64,
    dispatcher: Dispatcher,
    path: Arc<str>,
) -> Result<()> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let dispatcher = dispatcher.clone();
        let path = Arc::clone(&path);
        async move { Ok::<_, Infallible>(handle_request(&dispatcher, &path, req).await) }
    });

    http1::Builder::new()
        .serve_connection(io, service)
        .await
        .map_err(|e| Error::Transport(e.to_string()))
}

/// Answer one HTTP request
pub async fn handle_request<B>(
    dispatcher: &Dispatcher,
    path: &str,
    req: Request<B>,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: std::fmt::Display,
{
    if req.uri().path() != path {
        return plain(StatusCode::NOT_FOUND, "404 page not found\n");
    }
    if req.method() != Method::POST {
        let mut response = plain(
            StatusCode::METHOD_NOT_ALLOWED,
            &format!("rpc: POST method required, received {}\n", req.method()),
        );
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("POST"));
        return response;
    }
    if !is_json(&req) {
        return plain(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "rpc: unrecognized Content-Type, expected application/json\n",
        );
    }

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return plain(
                StatusCode::BAD_REQUEST,
                &format!("rpc: failed to read request body: {}\n", e),
            )
        }
    };

    envelope(&handle_body(dispatcher, &body).await)
}

/// Decode, dispatch and wrap one JSON-RPC request body
async fn handle_body(dispatcher: &Dispatcher, body: &[u8]) -> JsonRpcResponse {
    let request: JsonRpcRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Unparseable JSON-RPC body");
            return JsonRpcResponse::error(JsonRpcErrorData::parse_error(), Id::Null);
        }
    };
    if request.jsonrpc != "2.0" {
        return JsonRpcResponse::error(
            JsonRpcErrorData::invalid_request("jsonrpc must be \"2.0\""),
            request.id,
        );
    }

    tracing::debug!(method = %request.method, id = %request.id, "Handling request");

    let outcome = match request.argument() {
        Ok(argument) => dispatcher.dispatch(&request.method, argument).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(Payload::Json(result)) => JsonRpcResponse::success(result, request.id),
        Ok(Payload::Binary(_)) => JsonRpcResponse::error(
            JsonRpcErrorData::internal_error(format!(
                "{} returned a binary result on an HTTP endpoint",
                request.method
            )),
            request.id,
        ),
        Err(e) => {
            tracing::debug!(method = %request.method, error = %e, "Request failed");
            JsonRpcResponse::error(JsonRpcErrorData::from(&e), request.id)
        }
    }
}

fn is_json<B>(req: &Request<B>) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false)
}

fn envelope(response: &JsonRpcResponse) -> Response<Full<Bytes>> {
    match serde_json::to_vec(response) {
        Ok(bytes) => {
            let mut http = Response::new(Full::new(Bytes::from(bytes)));
            http.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            http
        }
        Err(e) => plain(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to encode response: {}\n", e),
        ),
    }
}

fn plain(status: StatusCode, text: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(text.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
