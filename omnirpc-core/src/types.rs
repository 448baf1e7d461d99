//! Core data types for omnirpc
//!
//! - **Network**: which transport a client or server speaks
//! - **Payload**: an argument or result in flight, in one of the two encodings
//! - **Id / JsonRpcRequest / JsonRpcResponse**: the HTTP JSON-RPC 2.0 envelope
//!
//! # Envelope Shape
//!
//! Requests always carry `params` as a one-element array holding the call's
//! argument. Responses always carry all four fields; the unused one of
//! `result`/`error` is `null`:
//!
//! ```json
//! {"jsonrpc": "2.0", "method": "Arith.HttpAdd", "params": [{"a": 10, "b": 20}], "id": "6f1c..."}
//! {"jsonrpc": "2.0", "result": {"value": 30}, "error": null, "id": "6f1c..."}
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transport selected for a client or server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Persistent TCP connection carrying framed requests
    Tcp,
    /// One JSON-RPC envelope per HTTP POST
    Http,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Tcp => "tcp",
            Network::Http => "http",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tcp" => Ok(Network::Tcp),
            "http" => Ok(Network::Http),
            other => Err(Error::Configuration(format!(
                "network is not tcp or http: {:?}",
                other
            ))),
        }
    }
}

/// Encoding of a [`Payload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Json,
    Binary,
}

/// An argument or result value travelling between client and handler
///
/// The dispatcher never inspects payloads. Typed handlers decode their
/// argument from whichever variant arrived and encode their result in the
/// same variant, so one method table serves both TCP codecs and HTTP.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A JSON value (JSON codec and HTTP)
    Json(serde_json::Value),
    /// MessagePack bytes (binary codec), structs encoded as field-name maps
    Binary(Vec<u8>),
}

impl Payload {
    /// Encode `value` in the given format
    pub fn encode<T: Serialize + ?Sized>(format: PayloadFormat, value: &T) -> Result<Self> {
        match format {
            PayloadFormat::Json => serde_json::to_value(value)
                .map(Payload::Json)
                .map_err(|e| Error::Serialization(e.to_string())),
            PayloadFormat::Binary => rmp_serde::to_vec_named(value)
                .map(Payload::Binary)
                .map_err(|e| Error::Serialization(e.to_string())),
        }
    }

    /// Decode the payload into `T`
    ///
    /// Any mismatch between the payload and `T` is an [`Error::Decode`].
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Payload::Json(value) => {
                serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
            }
            Payload::Binary(bytes) => {
                rmp_serde::from_slice(&bytes).map_err(|e| Error::Decode(e.to_string()))
            }
        }
    }

    pub fn format(&self) -> PayloadFormat {
        match self {
            Payload::Json(_) => PayloadFormat::Json,
            Payload::Binary(_) => PayloadFormat::Binary,
        }
    }
}

/// JSON-RPC request/response identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    String(String),
    Number(i64),
    Null,
}

impl Id {
    /// A fresh random correlation token (UUID v4)
    pub fn random() -> Self {
        Id::String(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "\"{}\"", s),
            Id::Number(n) => write!(f, "{}", n),
            Id::Null => write!(f, "null"),
        }
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Number(n)
    }
}

/// JSON-RPC 2.0 request envelope (HTTP transport)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default = "null_id")]
    pub id: Id,
}

fn null_id() -> Id {
    Id::Null
}

impl JsonRpcRequest {
    /// Build a request whose `params` is the one-element array `[arg]`
    pub fn new<A: Serialize + ?Sized>(method: impl Into<String>, arg: &A, id: Id) -> Result<Self> {
        let arg = serde_json::to_value(arg).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params: serde_json::Value::Array(vec![arg]),
            id,
        })
    }

    /// The single positional argument
    ///
    /// `params` must be an array of exactly one element.
    pub fn argument(&self) -> Result<Payload> {
        single_param(&self.params).map(Payload::Json)
    }
}

/// Extract the one positional argument from a `params` array
pub fn single_param(params: &serde_json::Value) -> Result<serde_json::Value> {
    match params {
        serde_json::Value::Array(items) if items.len() == 1 => Ok(items[0].clone()),
        serde_json::Value::Array(items) => Err(Error::Decode(format!(
            "rpc: invalid params: expected exactly one parameter, got {}",
            items.len()
        ))),
        serde_json::Value::Null => Err(Error::Decode(
            "rpc: invalid params: request body missing params".to_string(),
        )),
        _ => Err(Error::Decode(
            "rpc: invalid params: params must be an array".to_string(),
        )),
    }
}

/// JSON-RPC 2.0 response envelope (HTTP transport)
///
/// `result` and `error` are both always serialized; the unused one is `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default = "null_id")]
    pub id: Id,
}

impl JsonRpcResponse {
    pub fn success(result: serde_json::Value, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(error: crate::JsonRpcErrorData, id: Id) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: serde_json::to_value(&error).ok(),
            id,
        }
    }

    /// True when the `error` field holds anything other than `null`
    pub fn is_error(&self) -> bool {
        matches!(&self.error, Some(value) if !value.is_null())
    }
}
