use serde::{Deserialize, Serialize};

use crate::logger::CoreOptions;
use crate::metrics::DEFAULT_METRICS_PATH;
use crate::tracer::TracerOptions;

/// Root configuration for obskit.
///
/// Example:
/// ```toml
/// [service]
/// name = "billing"
/// namespace = "payments"
/// environment = "production"
///
/// [[logger]]
/// output_path = "stderr"
/// level = "INFO"
/// encoding = "console"
///
/// [metrics]
/// enabled = true
/// port = 9090
///
/// [tracer]
/// transport = "grpc"
/// host = "otel-collector"
/// port = 4317
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Identity shared by metrics and traces.
    /// Example: [service]
    pub service: ServiceConfig,
    /// Logging cores; none means a single stderr console core at DEBUG.
    /// Example: [[logger]]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logger: Vec<CoreOptions>,
    /// Prometheus scrape endpoint.
    /// Example: [metrics]
    pub metrics: MetricsConfig,
    /// Optional span export.
    /// Example: [tracer]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracer: Option<TracerOptions>,
}

impl Config {
    /// Logging cores to build, falling back to the default core.
    pub fn logger_cores(&self) -> Vec<CoreOptions> {
        if self.logger.is_empty() {
            vec![CoreOptions::default()]
        } else {
            self.logger.clone()
        }
    }
}

/// Service identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Service name reported in traces.
    /// Example: name = "billing"
    pub name: String,
    /// Optional namespace; traces use `namespace.name`, metrics use it as prefix.
    /// Example: namespace = "payments"
    pub namespace: String,
    /// Deployment environment.
    /// Example: environment = "production"
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            namespace: String::new(),
            environment: "development".to_string(),
        }
    }
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve the scrape endpoint.
    /// Example: enabled = true
    pub enabled: bool,
    /// Bind address.
    /// Example: bind = "127.0.0.1"
    pub bind: String,
    /// Port.
    /// Example: port = 9090
    pub port: u16,
    /// Scrape path.
    /// Example: path = "/metrics"
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "127.0.0.1".to_string(),
            port: 9090,
            path: DEFAULT_METRICS_PATH.to_string(),
        }
    }
}
