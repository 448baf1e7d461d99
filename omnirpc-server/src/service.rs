//! Service contract and registration
//!
//! A service groups methods under one name. Callers address a method as
//! `"<ServiceName>.<MethodName>"`; the service name defaults to the
//! implementing type's name.
//!
//! # Examples
//!
//! ```rust
//! use omnirpc_server::{MethodSet, Service, ServiceRegistration};
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Deserialize)]
//! struct Args { a: i64, b: i64 }
//!
//! struct Arith;
//!
//! impl Service for Arith {
//!     fn methods(self: Arc<Self>) -> MethodSet {
//!         MethodSet::new()
//!             .method("Add", |args: Args| async move { Ok(args.a + args.b) })
//!             .method("Mul", |args: Args| async move { Ok(args.a * args.b) })
//!     }
//! }
//!
//! assert_eq!(Arith.name(), "Arith");
//! let registration = ServiceRegistration::new(Arith);
//! assert!(registration.name.is_none());
//! ```

use crate::handler::{from_fn, from_typed_fn, Method};
use omnirpc_core::{Payload, Result};
use std::future::Future;
use std::sync::Arc;

/// A named group of remotely callable methods
pub trait Service: Send + Sync + 'static {
    /// Service name used in `"Service.Method"`
    ///
    /// Defaults to the last path segment of the implementing type's name,
    /// without generic arguments.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// The methods this service exposes
    ///
    /// Called once when the dispatch table is built.
    fn methods(self: Arc<Self>) -> MethodSet;
}

/// `my_crate::svc::Arith<u8>` becomes `Arith`
pub(crate) fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Ordered list of a service's methods
///
/// Duplicate names are kept so that the registry can report them.
#[derive(Default)]
pub struct MethodSet {
    entries: Vec<(String, Arc<dyn Method>)>,
}

impl MethodSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a typed method
    pub fn method<P, R, F, Fut>(self, name: impl Into<String>, func: F) -> Self
    where
        P: serde::de::DeserializeOwned + Send + 'static,
        R: serde::Serialize + Send + 'static,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        self.insert(name, from_typed_fn(func))
    }

    /// Add a method working on raw payloads
    pub fn raw<F, Fut>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        self.insert(name, from_fn(func))
    }

    /// Add an already-built method
    pub fn insert(mut self, name: impl Into<String>, method: Box<dyn Method>) -> Self {
        self.entries.push((name.into(), Arc::from(method)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, Arc<dyn Method>)> {
        self.entries
    }
}

/// One service offered to a server
///
/// An absent or empty `name` falls back to [`Service::name`]. A registration
/// without a handler is skipped.
#[derive(Clone, Default)]
pub struct ServiceRegistration {
    pub name: Option<String>,
    pub handler: Option<Arc<dyn Service>>,
}

impl ServiceRegistration {
    /// Register `service` under its own name
    pub fn new<S: Service>(service: S) -> Self {
        Self {
            name: None,
            handler: Some(Arc::new(service)),
        }
    }

    /// Register `service` under an explicit name
    pub fn named<S: Service>(name: impl Into<String>, service: S) -> Self {
        Self {
            name: Some(name.into()),
            handler: Some(Arc::new(service)),
        }
    }

    /// Register an already shared service
    pub fn from_arc(service: Arc<dyn Service>) -> Self {
        Self {
            name: None,
            handler: Some(service),
        }
    }

    /// Name the registry will bind this service under
    pub(crate) fn effective_name(&self) -> Option<String> {
        let handler = self.handler.as_ref()?;
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => Some(handler.name()),
        }
    }
}

impl std::fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("name", &self.effective_name())
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
