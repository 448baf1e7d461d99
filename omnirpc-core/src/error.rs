//! Error types for omnirpc
//!
//! This module provides the error taxonomy shared by the server, the client
//! and the task-queue interface. It defines three types:
//!
//! - **Error**: Application-level errors returned from every fallible call
//! - **RegistrationErrors**: Every cause collected while building a dispatcher
//! - **JsonRpcErrorData**: Wire-format errors carried in the HTTP envelope
//!
//! # Error Categories
//!
//! - **Caller-local**: Configuration, InvalidArgument (never touch the network)
//! - **Build time**: Registration
//! - **Network**: Dial, Transport, ConnectionClosed
//! - **Payload**: Decode, Serialization
//! - **Remote outcome**: MethodNotFound, Handler, Remote
//!
//! # Wire Messages on TCP
//!
//! A TCP error response carries a message and, from omnirpc servers, a
//! [`WireErrorKind`](crate::codec::WireErrorKind) naming the variant. When the
//! kind is missing the client falls back to the message text;
//! [`Error::to_wire_message`] and [`Error::from_wire_message`] convert between
//! the two:
//!
//! ```rust
//! use omnirpc_core::Error;
//!
//! let sent = Error::MethodNotFound("rpc: can't find method Arith.Sub".into());
//! let received = Error::from_wire_message(sent.to_wire_message());
//! assert!(matches!(received, Error::MethodNotFound(_)));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for omnirpc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prefixes the dispatcher uses for lookup failures
const METHOD_NOT_FOUND_PREFIXES: [&str; 2] = ["rpc: can't find", "rpc: service/method request ill-formed"];

/// Prefix the dispatcher uses for argument decode failures
const INVALID_PARAMS_PREFIX: &str = "rpc: invalid params";

/// Application-level error type for omnirpc operations
///
/// Every public operation returns this enum. Variants carry a rendered
/// message rather than the source error so the type stays `Clone` and can be
/// sent back across a connection.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Missing or invalid address, path or network mode
    ///
    /// Raised before any I/O is attempted.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// One or more service registrations were rejected
    #[error("registration error: {0}")]
    Registration(RegistrationErrors),

    /// The argument or result slot has the wrong shape for the transport
    ///
    /// Raised before any I/O is attempted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Establishing the connection failed
    #[error("dial error: {0}")]
    Dial(String),

    /// Network failure after the connection was established
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or codec-mismatched payload
    #[error("decode error: {0}")]
    Decode(String),

    /// A value could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// No method is registered under the requested `Service.Method`
    #[error("method not found: {0}")]
    MethodNotFound(String),

    /// The remote method itself reported a failure
    ///
    /// The message is the handler's own text, unmodified.
    #[error("{0}")]
    Handler(String),

    /// The HTTP response envelope carried a non-null `error` field
    #[error("remote error: {0}")]
    Remote(serde_json::Value),

    /// The peer closed the connection before a complete message arrived
    #[error("connection closed")]
    ConnectionClosed,
}

impl Error {
    /// Shorthand for handler code reporting a failure
    pub fn handler(msg: impl Into<String>) -> Self {
        Error::Handler(msg.into())
    }

    /// Render this error as the string carried in a TCP response
    ///
    /// Lookup and decode failures already hold their `rpc: ...` text, and
    /// handler failures are sent verbatim.
    pub fn to_wire_message(&self) -> String {
        match self {
            Error::MethodNotFound(msg) | Error::Handler(msg) => msg.clone(),
            Error::Decode(msg) if msg.starts_with(INVALID_PARAMS_PREFIX) => msg.clone(),
            Error::Decode(msg) => format!("{}: {}", INVALID_PARAMS_PREFIX, msg),
            other => other.to_string(),
        }
    }

    /// Classify an error string received in a TCP response without a kind
    pub fn from_wire_message(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        if METHOD_NOT_FOUND_PREFIXES.iter().any(|p| msg.starts_with(p)) {
            Error::MethodNotFound(msg)
        } else if msg.starts_with(INVALID_PARAMS_PREFIX) {
            Error::Decode(msg)
        } else {
            Error::Handler(msg)
        }
    }

    /// True for errors raised before any network activity
    pub fn is_caller_local(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::InvalidArgument(_))
    }
}

impl From<RegistrationErrors> for Error {
    fn from(errors: RegistrationErrors) -> Self {
        Error::Registration(errors)
    }
}

impl From<JsonRpcErrorData> for Error {
    fn from(data: JsonRpcErrorData) -> Self {
        match serde_json::to_value(&data) {
            Ok(value) => Error::Remote(value),
            Err(_) => Error::Remote(serde_json::Value::String(data.to_string())),
        }
    }
}

/// Every cause collected while binding service registrations
///
/// Registration does not stop at the first failure: each registration is
/// tried and each failure is appended here, so one build reports all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationErrors {
    causes: Vec<String>,
}

impl RegistrationErrors {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure
    pub fn push(&mut self, cause: impl Into<String>) {
        self.causes.push(cause.into());
    }

    /// The recorded failures, in registration order
    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    pub fn len(&self) -> usize {
        self.causes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.causes.is_empty()
    }

    /// `Ok(())` when nothing was recorded, otherwise the aggregated error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Registration(self))
        }
    }
}

impl fmt::Display for RegistrationErrors {
    /// Formats like a multi-error list: a count header, then one bullet per cause
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.causes.as_slice() {
            [] => write!(f, "no errors"),
            [only] => write!(f, "1 error occurred:\n\t* {}", only),
            causes => {
                write!(f, "{} errors occurred:", causes.len())?;
                for cause in causes {
                    write!(f, "\n\t* {}", cause)?;
                }
                Ok(())
            }
        }
    }
}

/// JSON-RPC 2.0 error data as carried in the HTTP envelope
///
/// # Standard Error Codes
///
/// - `-32700`: Parse error
/// - `-32600`: Invalid Request
/// - `-32601`: Method not found
/// - `-32602`: Invalid params
/// - `-32603`: Internal error
/// - `-32000`: Server error (used here for handler failures)
///
/// # Examples
///
/// ```rust
/// use omnirpc_core::JsonRpcErrorData;
///
/// let error = JsonRpcErrorData::method_not_found("Arith.Sub");
/// assert_eq!(error.code, -32601);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code indicating the error type
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Optional additional error information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcErrorData {
    /// Create a new JSON-RPC error with code and message
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new JSON-RPC error with additional data
    pub fn with_data(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create a parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(-32700, "Parse error")
    }

    /// Create an invalid request error (-32600)
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::new(-32600, msg)
    }

    /// Create a method not found error (-32601)
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Create an invalid params error (-32602)
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::new(-32602, msg)
    }

    /// Create an internal error (-32603)
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::new(-32603, msg)
    }

    /// Create a server error (-32000) carrying a handler's message verbatim
    pub fn server_error(msg: impl Into<String>) -> Self {
        Self::new(-32000, msg)
    }
}

impl From<&Error> for JsonRpcErrorData {
    fn from(error: &Error) -> Self {
        match error {
            Error::MethodNotFound(msg) => JsonRpcErrorData::new(-32601, msg.clone()),
            Error::Decode(msg) => JsonRpcErrorData::invalid_params(msg.clone()),
            Error::Handler(msg) => JsonRpcErrorData::server_error(msg.clone()),
            other => JsonRpcErrorData::internal_error(other.to_string()),
        }
    }
}

impl fmt::Display for JsonRpcErrorData {
    /// Formats as "[code] message"
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcErrorData {}
