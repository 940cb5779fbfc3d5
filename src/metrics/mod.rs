//! Prometheus metrics registry and scrape endpoint.

pub mod handler;
pub mod server;
pub mod service;

pub use handler::{METRICS_CONTENT_TYPE, metrics_handler};
pub use server::MetricsServer;
pub use service::{DEFAULT_METRICS_PATH, MetricableService, MetricsService, Registrar};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Metric {0} is already registered")]
    AlreadyRegistered(String),

    #[error("Invalid metric name {0:?}")]
    InvalidName(String),

    #[error("Failed to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),

    #[error("Metrics registry lock poisoned")]
    Poisoned,
}
