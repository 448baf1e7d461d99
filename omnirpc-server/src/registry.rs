//! Dispatch table for registered services
//!
//! [`Dispatcher::build`] binds every [`ServiceRegistration`] into a read-only
//! [`Registry`] and then routes `"Service.Method"` calls to it. The table is
//! shared behind an `Arc` and never mutated after the build, so connection
//! tasks look methods up without locking.
//!
//! # Registration Errors
//!
//! Each registration is bound independently. Every failure is recorded and
//! the build reports all of them in one [`Error::Registration`]:
//!
//! - empty service name
//! - a service exposing no methods
//! - a method name that is empty or contains `.`
//! - the same method twice in one service
//! - a service name already defined
//!
//! # Examples
//!
//! ```rust
//! use omnirpc_core::{Network, Payload};
//! use omnirpc_server::{Dispatcher, MethodSet, Service, ServiceRegistration};
//! use std::sync::Arc;
//!
//! struct Echo;
//!
//! impl Service for Echo {
//!     fn methods(self: Arc<Self>) -> MethodSet {
//!         MethodSet::new().method("Say", |s: String| async move { Ok(s) })
//!     }
//! }
//!
//! # async fn example() -> omnirpc_core::Result<()> {
//! let dispatcher = Dispatcher::build(Network::Tcp, vec![ServiceRegistration::new(Echo)])?;
//! let reply = dispatcher
//!     .dispatch("Echo.Say", Payload::Json(serde_json::json!("hi")))
//!     .await?;
//! assert_eq!(reply, Payload::Json(serde_json::json!("hi")));
//! # Ok(())
//! # }
//! ```

use crate::handler::Method;
use crate::service::ServiceRegistration;
use omnirpc_core::{Error, Network, Payload, RegistrationErrors, Result};
use std::collections::HashMap;
use std::sync::Arc;

type MethodTable = HashMap<String, Arc<dyn Method>>;

/// Read-only map of services to their methods
#[derive(Clone, Default)]
pub struct Registry {
    services: Arc<HashMap<String, MethodTable>>,
}

impl Registry {
    /// Bind `registrations`, collecting every failure
    fn bind(registrations: Vec<ServiceRegistration>) -> Result<Self> {
        let mut errors = RegistrationErrors::new();
        if registrations.is_empty() {
            errors.push("services is empty");
            return Err(errors.into());
        }

        let mut services: HashMap<String, MethodTable> = HashMap::new();
        for registration in registrations {
            let Some(handler) = registration.handler.clone() else {
                continue;
            };
            let Some(name) = registration.effective_name() else {
                continue;
            };
            if name.is_empty() {
                errors.push("rpc.Register: no service name for type");
                continue;
            }
            if services.contains_key(&name) {
                errors.push(format!("rpc: service already defined: {}", name));
                continue;
            }

            let entries = handler.methods().into_entries();
            if entries.is_empty() {
                errors.push(format!(
                    "rpc.Register: type {} has no exported methods of suitable type",
                    name
                ));
                continue;
            }

            let mut table = MethodTable::new();
            let mut valid = true;
            for (method, implementation) in entries {
                if method.is_empty() || method.contains('.') {
                    errors.push(format!(
                        "rpc.Register: method name {:?} of service {} is not valid",
                        method, name
                    ));
                    valid = false;
                } else if table.contains_key(&method) {
                    errors.push(format!(
                        "rpc.Register: method {}.{} registered twice",
                        name, method
                    ));
                    valid = false;
                } else {
                    table.insert(method, implementation);
                }
            }
            if valid {
                tracing::debug!(service = %name, methods = table.len(), "Service registered");
                services.insert(name, table);
            }
        }

        errors.into_result()?;
        Ok(Self {
            services: Arc::new(services),
        })
    }

    /// Look up `"Service.Method"`
    ///
    /// The service part is everything before the last dot.
    pub fn lookup(&self, method: &str) -> Result<Arc<dyn Method>> {
        let (service, name) = method.rsplit_once('.').ok_or_else(|| {
            Error::MethodNotFound(format!(
                "rpc: service/method request ill-formed: {}",
                method
            ))
        })?;
        let table = self
            .services
            .get(service)
            .ok_or_else(|| Error::MethodNotFound(format!("rpc: can't find service {}", method)))?;
        table
            .get(name)
            .cloned()
            .ok_or_else(|| Error::MethodNotFound(format!("rpc: can't find method {}", method)))
    }

    /// Check if a `"Service.Method"` is registered
    pub fn has_method(&self, method: &str) -> bool {
        self.lookup(method).is_ok()
    }

    /// Every registered `"Service.Method"`, sorted
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self
            .services
            .iter()
            .flat_map(|(service, table)| table.keys().map(move |m| format!("{}.{}", service, m)))
            .collect();
        methods.sort();
        methods
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }
}

/// Routes calls for one transport
///
/// Cheap to clone; every clone shares the same table.
#[derive(Clone)]
pub struct Dispatcher {
    network: Network,
    registry: Registry,
}

impl Dispatcher {
    /// Build the dispatch table for `network`
    ///
    /// # Errors
    ///
    /// [`Error::Registration`] listing every rejected registration, or the
    /// single cause `services is empty`.
    pub fn build(network: Network, registrations: Vec<ServiceRegistration>) -> Result<Self> {
        let registry = Registry::bind(registrations)?;
        tracing::debug!(
            network = %network,
            services = registry.service_count(),
            "Dispatch table built"
        );
        Ok(Self { network, registry })
    }

    /// Invoke `method` with `params`
    pub async fn dispatch(&self, method: &str, params: Payload) -> Result<Payload> {
        let implementation = self.registry.lookup(method)?;
        implementation.call(params).await
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn methods(&self) -> Vec<String> {
        self.registry.methods()
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.registry.has_method(method)
    }
}
