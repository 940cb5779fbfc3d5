//! Distributed tracing: an OTLP span exporter behind a batching provider,
//! a process-wide tracer handle and header propagation for message queues.

pub mod propagation;
pub mod provider;
pub mod span;

pub use propagation::{SPAN_ID_HEADER, TRACE_ID_HEADER, extract_headers, inject_headers};
pub use provider::{
    BatchOptions, SamplerKind, TracerGuard, TracerOptions, Transport, qualified_service_name,
    setup_tracer_provider,
};
pub use span::{
    new_span, new_span_with_attributes, service_name, setup_global_tracer, span_from_context,
    tracer,
};

#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("failed to create trace exporter for {endpoint}: {message}")]
    Exporter { endpoint: String, message: String },

    #[error("Sampling ratio {0} is outside 0.0..=1.0")]
    InvalidRatio(f64),

    #[error("Failed to shut down tracer provider: {0}")]
    Shutdown(String),
}
