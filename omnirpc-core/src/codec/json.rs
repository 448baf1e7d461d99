//! Line-delimited JSON codec (the default TCP framing)
//!
//! Each message is one JSON object followed by `\n`:
//!
//! ```text
//! -> {"method":"Arith.Add","params":[{"a":10,"b":20}],"id":1}
//! <- {"id":1,"result":30,"error":null}
//! <- {"id":2,"result":null,"error":"rpc: can't find method Arith.Sub","kind":"method_not_found"}
//! ```
//!
//! `kind` only appears on failures. Peers that do not send it are classified
//! by their error text.
//!
//! The server codec accepts any JSON value as `id`. It hands the dispatcher a
//! connection-local sequence number instead and restores the original id when
//! the response is written.

use super::{
    io_error, ClientCodec, ServerCodec, WireError, WireErrorKind, WireRequest, WireResponse,
    MAX_FRAME_SIZE, NO_SEQ,
};
use crate::error::{Error, Result};
use crate::types::{single_param, Payload, PayloadFormat};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};

#[derive(Serialize)]
struct OutgoingRequest<'a> {
    method: &'a str,
    params: [&'a Value; 1],
    id: u64,
}

#[derive(Deserialize)]
struct IncomingRequest {
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    id: Value,
}

#[derive(Serialize)]
struct OutgoingResponse<'a> {
    id: &'a Value,
    result: Option<&'a Value>,
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<WireErrorKind>,
}

#[derive(Deserialize)]
struct IncomingResponse {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Value,
    #[serde(default)]
    kind: Value,
}

/// Read one JSON frame into `buf`
///
/// Returns `Ok(false)` on end of stream before any frame byte. The first
/// non-whitespace byte must open an object, which rejects binary frames
/// without waiting for a newline that may never come.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await.map_err(io_error)?;
        if available.is_empty() {
            return Ok(false);
        }
        let skip = available.iter().take_while(|b| b.is_ascii_whitespace()).count();
        if skip == available.len() {
            reader.consume(skip);
            continue;
        }
        let first = available[skip];
        reader.consume(skip);
        if first != b'{' {
            return Err(Error::Decode(format!(
                "unexpected byte 0x{:02x} at start of JSON frame",
                first
            )));
        }
        break;
    }

    buf.clear();
    let limit = MAX_FRAME_SIZE as u64 + 1;
    (&mut *reader)
        .take(limit)
        .read_until(b'\n', buf)
        .await
        .map_err(io_error)?;
    if buf.len() > MAX_FRAME_SIZE {
        return Err(Error::Decode(format!(
            "JSON frame exceeds {} bytes",
            MAX_FRAME_SIZE
        )));
    }
    Ok(true)
}

async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut bytes = serde_json::to_vec(message).map_err(|e| Error::Serialization(e.to_string()))?;
    bytes.push(b'\n');
    writer.write_all(&bytes).await.map_err(io_error)?;
    writer.flush().await.map_err(io_error)
}

fn json_payload(payload: &Payload) -> Result<&Value> {
    match payload {
        Payload::Json(value) => Ok(value),
        Payload::Binary(_) => Err(Error::Serialization(
            "binary payload on a JSON connection".to_string(),
        )),
    }
}

/// Server side of the JSON codec
pub struct JsonServerCodec<S> {
    stream: BufStream<S>,
    buf: Vec<u8>,
    next_seq: u64,
    /// Original request ids by sequence number, until the response is written
    pending: HashMap<u64, Value>,
}

impl<S> JsonServerCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
            buf: Vec::new(),
            next_seq: NO_SEQ + 1,
            pending: HashMap::new(),
        }
    }
}

#[async_trait]
impl<S> ServerCodec for JsonServerCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_request(&mut self) -> Result<Option<WireRequest>> {
        if !read_frame(&mut self.stream, &mut self.buf).await? {
            return Ok(None);
        }
        let incoming: IncomingRequest =
            serde_json::from_slice(&self.buf).map_err(|e| Error::Decode(e.to_string()))?;
        let params = single_param(&incoming.params)?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert(seq, incoming.id);

        Ok(Some(WireRequest {
            seq,
            method: incoming.method,
            params: Payload::Json(params),
        }))
    }

    async fn write_response(&mut self, response: WireResponse) -> Result<()> {
        let id = self.pending.remove(&response.seq).unwrap_or(Value::Null);
        let result = match (&response.error, &response.result) {
            (None, Some(payload)) => Some(json_payload(payload)?),
            _ => None,
        };
        let outgoing = OutgoingResponse {
            id: &id,
            result,
            error: response.error.as_ref().map(|e| e.message.as_str()),
            kind: response.error.as_ref().and_then(|e| e.kind),
        };
        write_frame(&mut self.stream, &outgoing).await
    }

    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::Json
    }
}

/// Client side of the JSON codec
pub struct JsonClientCodec<S> {
    stream: BufStream<S>,
    buf: Vec<u8>,
}

impl<S> JsonClientCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
            buf: Vec::new(),
        }
    }
}

#[async_trait]
impl<S> ClientCodec for JsonClientCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_request(&mut self, request: &WireRequest) -> Result<()> {
        let outgoing = OutgoingRequest {
            method: &request.method,
            params: [json_payload(&request.params)?],
            id: request.seq,
        };
        write_frame(&mut self.stream, &outgoing).await
    }

    async fn read_response(&mut self) -> Result<WireResponse> {
        if !read_frame(&mut self.stream, &mut self.buf).await? {
            return Err(Error::ConnectionClosed);
        }
        let incoming: IncomingResponse =
            serde_json::from_slice(&self.buf).map_err(|e| Error::Decode(e.to_string()))?;

        let seq = incoming.id.as_u64().unwrap_or(NO_SEQ);
        let message = match incoming.error {
            Value::Null => None,
            Value::String(msg) => Some(msg),
            other => Some(other.to_string()),
        };
        // An unrecognised kind is treated as absent.
        let kind = serde_json::from_value::<WireErrorKind>(incoming.kind).ok();
        let error = message.map(|message| WireError { kind, message });
        let result = match error {
            Some(_) => None,
            None => Some(Payload::Json(incoming.result)),
        };
        Ok(WireResponse { seq, result, error })
    }

    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::Json
    }
}
