//! Logging and tracing initialization
//!
//! Everything in omnirpc logs through the `tracing` macros. This module wires
//! those events to an output: a `tracing-subscriber` registry with an
//! `EnvFilter`, a fmt layer (JSON or human-readable) and, when traces are
//! enabled, an OpenTelemetry layer exporting spans over OTLP/gRPC.
//!
//! # Usage Pattern
//!
//! Initialize once at application startup, before starting servers:
//!
//! ```rust,no_run
//! use omnirpc_core::ObservabilityConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ObservabilityConfig::new("arith-service")
//!         .with_endpoint("http://localhost:4317")
//!         .with_log_level("debug");
//!
//!     omnirpc_core::init_observability(config).expect("Failed to init observability");
//!
//!     // ... run servers and clients ...
//!
//!     omnirpc_core::shutdown_observability();
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: Collector endpoint
//! - `RUST_LOG`: Log level filter (e.g., "info", "omnirpc_server=debug")

use crate::error::{Error, Result};
use opentelemetry::{global, KeyValue};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Observability configuration
///
/// # Defaults
///
/// - Service name: "omnirpc"
/// - Service version: Current crate version
/// - OTLP endpoint: `$OTEL_EXPORTER_OTLP_ENDPOINT` or "http://localhost:4317"
/// - Traces disabled (no collector is assumed)
/// - JSON log output
/// - Log level: `$RUST_LOG` or "info"
///
/// # Examples
///
/// ```rust
/// use omnirpc_core::ObservabilityConfig;
///
/// let config = ObservabilityConfig::new("arith-service")
///     .with_endpoint("http://collector:4317")
///     .with_traces(true)
///     .with_json(false);
/// assert!(config.enable_traces);
/// ```
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to exported spans
    pub service_name: String,

    pub service_version: String,

    /// gRPC endpoint of the OpenTelemetry collector
    pub otlp_endpoint: String,

    /// Export spans over OTLP
    ///
    /// Local log output works either way.
    pub enable_traces: bool,

    /// Emit log lines as JSON objects instead of plain text
    pub json: bool,

    /// Filter used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "omnirpc".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
            enable_traces: false,
            json: true,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}

impl ObservabilityConfig {
    /// Create a configuration with a custom service name and default settings
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Set the OTLP collector endpoint (e.g., "http://collector:4317")
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = endpoint.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = version.into();
        self
    }

    /// Enable or disable span export
    pub fn with_traces(mut self, enable: bool) -> Self {
        self.enable_traces = enable;
        self
    }

    /// Choose JSON (`true`) or plain text (`false`) log lines
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Install the global subscriber described by `config`
///
/// Call this once at startup. A second call, or a call after another global
/// subscriber was installed, returns [`Error::Configuration`] and leaves the
/// existing subscriber in place.
///
/// # Errors
///
/// - The log filter does not parse
/// - The OTLP exporter cannot be built
/// - A global subscriber is already installed
pub fn init_observability(config: ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| Error::Configuration(format!("invalid log filter: {}", e)))?;

    let tracer = if config.enable_traces {
        Some(init_tracer(&config)?)
    } else {
        None
    };
    let telemetry_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .json()
    });
    let plain_layer = (!config.json).then(|| tracing_subscriber::fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(telemetry_layer)
        .with(env_filter)
        .with(json_layer)
        .with(plain_layer)
        .try_init()
        .map_err(|e| Error::Configuration(format!("logging already initialized: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        traces = config.enable_traces,
        otlp_endpoint = %config.otlp_endpoint,
        "Observability initialized"
    );

    Ok(())
}

/// Build the OTLP span pipeline, register it globally and return its tracer
fn init_tracer(config: &ObservabilityConfig) -> Result<opentelemetry_sdk::trace::Tracer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler};
    use opentelemetry_sdk::Resource;

    let resource = Resource::builder_empty()
        .with_attributes(vec![
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME,
                config.service_name.clone(),
            ),
            KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_VERSION,
                config.service_version.clone(),
            ),
        ])
        .build();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otlp_endpoint.clone())
        .build()
        .map_err(|e| Error::Configuration(format!("OTLP exporter: {}", e)))?;

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .with_sampler(Sampler::AlwaysOn)
        .with_id_generator(RandomIdGenerator::default())
        .build();

    let tracer = provider.tracer(config.service_name.clone());
    global::set_tracer_provider(provider);

    Ok(tracer)
}

/// Flush pending spans before exit
///
/// Providers flush on drop; this marks the point explicitly in the log.
pub fn shutdown_observability() {
    tracing::info!("Shutting down observability");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.service_name, "omnirpc");
        assert!(!config.enable_traces);
        assert!(config.json);
    }

    #[test]
    fn test_config_builder_chaining() {
        let config = ObservabilityConfig::new("arith")
            .with_endpoint("http://test:4317")
            .with_log_level("debug")
            .with_version("2.0.0")
            .with_traces(true)
            .with_json(false);

        assert_eq!(config.service_name, "arith");
        assert_eq!(config.otlp_endpoint, "http://test:4317");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.service_version, "2.0.0");
        assert!(config.enable_traces);
        assert!(!config.json);
    }

    #[test]
    fn test_second_init_is_an_error() {
        let config = ObservabilityConfig::new("test-init").with_log_level("warn");
        assert!(init_observability(config.clone()).is_ok());
        assert!(matches!(
            init_observability(config),
            Err(Error::Configuration(_))
        ));
        shutdown_observability();
    }
}
