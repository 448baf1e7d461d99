//! Method trait and adapters
//!
//! A [`Method`] is one callable entry in a service: it takes the call's single
//! argument as a [`Payload`] and produces a result payload or an error.
//!
//! # Creating Methods
//!
//! 1. **from_fn**: Wrap an async closure that works with raw payloads
//! 2. **from_typed_fn**: Wrap an async closure with automatic decoding and encoding
//!
//! Typed methods decode their argument from whichever encoding arrived (JSON
//! on the default TCP codec and HTTP, MessagePack on the binary codec) and encode
//! the result the same way, so one method serves every transport.
//!
//! # Examples
//!
//! ```rust
//! use omnirpc_server::{from_fn, from_typed_fn};
//! use serde::Deserialize;
//!
//! // Raw payload method
//! let echo = from_fn(|params| async move { Ok(params) });
//!
//! // Typed method
//! #[derive(Deserialize)]
//! struct Args { a: i32, b: i32 }
//!
//! let add = from_typed_fn(|args: Args| async move { Ok(args.a + args.b) });
//! ```

use omnirpc_core::{Payload, Result};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by [`Method::call`]
pub type MethodFuture = Pin<Box<dyn Future<Output = Result<Payload>> + Send>>;

/// One remotely callable method
///
/// Errors returned here reach the caller unchanged: [`omnirpc_core::Error::Handler`]
/// keeps its message verbatim on every transport.
pub trait Method: Send + Sync {
    fn call(&self, params: Payload) -> MethodFuture;
}

/// Adapts an async function into a [`Method`]
pub struct AsyncMethod<F, Fut>
where
    F: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    func: F,
}

impl<F, Fut> AsyncMethod<F, Fut>
where
    F: Fn(Payload) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F, Fut> Method for AsyncMethod<F, Fut>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    fn call(&self, params: Payload) -> MethodFuture {
        Box::pin((self.func)(params))
    }
}

/// Create a method from an async function over raw payloads
///
/// # Examples
///
/// ```rust
/// use omnirpc_core::Payload;
/// use omnirpc_server::from_fn;
///
/// let method = from_fn(|params: Payload| async move {
///     match params {
///         Payload::Json(v) => Ok(Payload::Json(serde_json::json!({"echo": v}))),
///         other => Ok(other),
///     }
/// });
/// ```
pub fn from_fn<F, Fut>(func: F) -> Box<dyn Method>
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    Box::new(AsyncMethod::new(func))
}

/// Create a method from an async function with typed argument and result
///
/// # Error Handling
///
/// - Argument does not decode into `P`: [`omnirpc_core::Error::Decode`]
/// - Result does not encode: [`omnirpc_core::Error::Serialization`]
/// - Errors from `func` pass through unchanged
pub fn from_typed_fn<P, R, F, Fut>(func: F) -> Box<dyn Method>
where
    P: serde::de::DeserializeOwned + Send + 'static,
    R: serde::Serialize + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    let func = Arc::new(func);

    from_fn(move |params: Payload| {
        let func = Arc::clone(&func);
        async move {
            let format = params.format();
            let args: P = params.decode()?;
            let result = func(args).await?;
            Payload::encode(format, &result)
        }
    })
}
