//! Length-prefixed MessagePack codec (the alternate TCP framing)
//!
//! Each frame is a 4-byte big-endian body length followed by the MessagePack
//! encoding of a request or response. Arguments and results travel as nested
//! MessagePack bytes so handlers decode them with their own types.
//!
//! Structs are written as maps keyed by field name, so optional and skipped
//! fields decode the same way they do over JSON.

use super::{
    io_error, ClientCodec, ServerCodec, WireError, WireErrorKind, WireRequest, WireResponse,
    MAX_FRAME_SIZE,
};
use crate::error::{Error, Result};
use crate::types::{Payload, PayloadFormat};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};

#[derive(Debug, Serialize, Deserialize)]
struct BinaryRequest {
    seq: u64,
    method: String,
    params: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct BinaryResponse {
    seq: u64,
    error: Option<String>,
    #[serde(default)]
    kind: Option<WireErrorKind>,
    result: Vec<u8>,
}

/// Read the next frame body
///
/// `Ok(None)` when the stream ends before the first length byte; a stream
/// ending anywhere else is [`Error::ConnectionClosed`].
async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await.map_err(io_error)?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(Error::ConnectionClosed)
            };
        }
        filled += n;
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(Error::Decode(format!(
            "frame length {} exceeds {} bytes",
            len, MAX_FRAME_SIZE
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await.map_err(io_error)?;
    Ok(Some(body))
}

async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = rmp_serde::to_vec_named(message).map_err(|e| Error::Serialization(e.to_string()))?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(Error::Serialization(format!(
            "frame length {} exceeds {} bytes",
            body.len(),
            MAX_FRAME_SIZE
        )));
    }
    writer
        .write_all(&(body.len() as u32).to_be_bytes())
        .await
        .map_err(io_error)?;
    writer.write_all(&body).await.map_err(io_error)?;
    writer.flush().await.map_err(io_error)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    rmp_serde::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}

fn binary_payload(payload: Payload) -> Result<Vec<u8>> {
    match payload {
        Payload::Binary(bytes) => Ok(bytes),
        Payload::Json(_) => Err(Error::Serialization(
            "JSON payload on a binary connection".to_string(),
        )),
    }
}

/// Server side of the binary codec
pub struct BinaryServerCodec<S> {
    stream: BufStream<S>,
}

impl<S> BinaryServerCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }
}

#[async_trait]
impl<S> ServerCodec for BinaryServerCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_request(&mut self) -> Result<Option<WireRequest>> {
        let Some(body) = read_frame(&mut self.stream).await? else {
            return Ok(None);
        };
        let request: BinaryRequest = decode_body(&body)?;
        Ok(Some(WireRequest {
            seq: request.seq,
            method: request.method,
            params: Payload::Binary(request.params),
        }))
    }

    async fn write_response(&mut self, response: WireResponse) -> Result<()> {
        let result = match (&response.error, response.result) {
            (None, Some(payload)) => binary_payload(payload)?,
            _ => Vec::new(),
        };
        let (error, kind) = match response.error {
            Some(wire) => (Some(wire.message), wire.kind),
            None => (None, None),
        };
        let outgoing = BinaryResponse {
            seq: response.seq,
            error,
            kind,
            result,
        };
        write_frame(&mut self.stream, &outgoing).await
    }

    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::Binary
    }
}

/// Client side of the binary codec
pub struct BinaryClientCodec<S> {
    stream: BufStream<S>,
}

impl<S> BinaryClientCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }
}

#[async_trait]
impl<S> ClientCodec for BinaryClientCodec<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_request(&mut self, request: &WireRequest) -> Result<()> {
        let outgoing = BinaryRequest {
            seq: request.seq,
            method: request.method.clone(),
            params: binary_payload(request.params.clone())?,
        };
        write_frame(&mut self.stream, &outgoing).await
    }

    async fn read_response(&mut self) -> Result<WireResponse> {
        let body = read_frame(&mut self.stream)
            .await?
            .ok_or(Error::ConnectionClosed)?;
        let response: BinaryResponse = decode_body(&body)?;
        let (result, error) = match response.error {
            Some(message) => (
                None,
                Some(WireError {
                    kind: response.kind,
                    message,
                }),
            ),
            None => (Some(Payload::Binary(response.result)), None),
        };
        Ok(WireResponse {
            seq: response.seq,
            result,
            error,
        })
    }

    fn payload_format(&self) -> PayloadFormat {
        PayloadFormat::Binary
    }
}
