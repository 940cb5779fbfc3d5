use std::time::Duration;

use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{
    self as sdktrace, BatchConfig, BatchConfigBuilder, BatchSpanProcessor, Sampler,
};
use opentelemetry_sdk::{Resource, runtime};
use serde::{Deserialize, Serialize};
use tracing::{Subscriber, info, warn};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;

use crate::tracer::TracerError;
use crate::tracer::span::setup_global_tracer;

const SERVICE_NAME: &str = "service.name";
const SERVICE_VERSION: &str = "service.version";
const DEPLOYMENT_ENVIRONMENT: &str = "deployment.environment";

/// How spans reach the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// OTLP over HTTP/protobuf, posted to `/v1/traces`.
    Http,
    /// OTLP over gRPC.
    #[default]
    Grpc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    AlwaysOn,
    AlwaysOff,
    Ratio,
    /// Follows the parent's decision, sampling roots by ratio.
    #[default]
    ParentRatio,
}

/// Batch span processor tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Example: max_queue_size = 2048
    pub max_queue_size: usize,
    /// Example: max_export_batch_size = 512
    pub max_export_batch_size: usize,
    /// Example: scheduled_delay_ms = 5000
    pub scheduled_delay_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_queue_size: 2048,
            max_export_batch_size: 512,
            scheduled_delay_ms: 5000,
        }
    }
}

impl BatchOptions {
    fn to_config(&self, export_timeout: Duration) -> BatchConfig {
        BatchConfigBuilder::default()
            .with_max_queue_size(self.max_queue_size)
            .with_max_export_batch_size(self.max_export_batch_size)
            .with_scheduled_delay(Duration::from_millis(self.scheduled_delay_ms))
            .with_max_export_timeout(export_timeout)
            .build()
    }
}

/// Span export configuration.
///
/// Example:
/// ```toml
/// [tracer]
/// transport = "http"
/// host = "otel-collector"
/// port = 4318
/// sampler = "ratio"
/// sampling_ratio = 0.25
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerOptions {
    /// Example: enabled = true
    pub enabled: bool,
    /// Example: transport = "grpc"
    pub transport: Transport,
    /// Collector host without scheme.
    /// Example: host = "localhost"
    pub host: String,
    /// Example: port = 4317
    pub port: u16,
    /// Example: sampler = "parent_ratio"
    pub sampler: SamplerKind,
    /// Used by the `ratio` and `parent_ratio` samplers.
    /// Example: sampling_ratio = 1.0
    pub sampling_ratio: f64,
    /// Export timeout in seconds.
    /// Example: timeout_secs = 10
    pub timeout_secs: u64,
    pub batch: BatchOptions,
}

impl Default for TracerOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            transport: Transport::Grpc,
            host: "localhost".to_string(),
            port: 4317,
            sampler: SamplerKind::ParentRatio,
            sampling_ratio: 1.0,
            timeout_secs: 10,
            batch: BatchOptions::default(),
        }
    }
}

impl TracerOptions {
    pub fn endpoint(&self) -> String {
        match self.transport {
            Transport::Http => format!("http://{}:{}/v1/traces", self.host, self.port),
            Transport::Grpc => format!("http://{}:{}", self.host, self.port),
        }
    }

    pub fn sampler(&self) -> Result<Sampler, TracerError> {
        let ratio = || {
            if (0.0..=1.0).contains(&self.sampling_ratio) {
                Ok(self.sampling_ratio)
            } else {
                Err(TracerError::InvalidRatio(self.sampling_ratio))
            }
        };

        Ok(match self.sampler {
            SamplerKind::AlwaysOn => Sampler::AlwaysOn,
            SamplerKind::AlwaysOff => Sampler::AlwaysOff,
            SamplerKind::Ratio => Sampler::TraceIdRatioBased(ratio()?),
            SamplerKind::ParentRatio => {
                Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(ratio()?)))
            }
        })
    }

    fn export_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `namespace.service_name`, or just the service name without a namespace.
pub fn qualified_service_name(namespace: &str, service_name: &str) -> String {
    if namespace.is_empty() {
        service_name.to_string()
    } else {
        format!("{namespace}.{service_name}")
    }
}

fn build_exporter(options: &TracerOptions) -> Result<SpanExporter, TracerError> {
    let endpoint = options.endpoint();
    let exporter = match options.transport {
        Transport::Http => SpanExporter::builder()
            .with_http()
            .with_endpoint(endpoint.clone())
            .with_timeout(options.export_timeout())
            .build(),
        Transport::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .with_timeout(options.export_timeout())
            .build(),
    };

    exporter.map_err(|err| TracerError::Exporter {
        endpoint,
        message: err.to_string(),
    })
}

/// Builds a batching tracer provider exporting to the configured collector and
/// installs it, a W3C trace-context + baggage propagator and the global tracer.
///
/// Must be called inside a Tokio runtime.
pub fn setup_tracer_provider(
    options: &TracerOptions,
    namespace: &str,
    service_name: &str,
    environment: &str,
) -> Result<TracerGuard, TracerError> {
    let service_name = qualified_service_name(namespace, service_name);
    let sampler = options.sampler()?;

    let resource = Resource::new([
        KeyValue::new(SERVICE_NAME, service_name.clone()),
        KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        KeyValue::new(DEPLOYMENT_ENVIRONMENT, environment.to_string()),
    ]);

    let exporter = build_exporter(options)?;
    let processor = BatchSpanProcessor::builder(exporter, runtime::Tokio)
        .with_batch_config(options.batch.to_config(options.export_timeout()))
        .build();

    let provider = sdktrace::TracerProvider::builder()
        .with_span_processor(processor)
        .with_config(
            sdktrace::Config::default()
                .with_resource(resource)
                .with_sampler(sampler),
        )
        .build();

    global::set_tracer_provider(provider.clone());
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));
    setup_global_tracer(global::tracer(service_name.clone()), service_name.clone());

    info!(
        endpoint = %options.endpoint(),
        transport = ?options.transport,
        service = %service_name,
        environment = %environment,
        "Tracer provider initialized"
    );

    Ok(TracerGuard {
        provider,
        service_name,
        active: true,
    })
}

/// Keeps the tracer provider alive; flushes and shuts it down on drop.
#[must_use = "dropping the guard shuts the tracer provider down"]
pub struct TracerGuard {
    provider: sdktrace::TracerProvider,
    service_name: String,
    active: bool,
}

impl std::fmt::Debug for TracerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerGuard")
            .field("service_name", &self.service_name)
            .field("active", &self.active)
            .finish()
    }
}

impl TracerGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn provider(&self) -> &sdktrace::TracerProvider {
        &self.provider
    }

    /// A `tracing` layer that turns spans into OpenTelemetry spans on this provider.
    pub fn tracing_layer<S>(&self) -> OpenTelemetryLayer<S, sdktrace::Tracer>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        tracing_opentelemetry::layer().with_tracer(self.provider.tracer(self.service_name.clone()))
    }

    /// Flushes pending spans and shuts the provider down. Later calls are no-ops.
    pub fn shutdown(&mut self) -> Result<(), TracerError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        global::shutdown_tracer_provider();
        self.provider
            .shutdown()
            .map_err(|err| TracerError::Shutdown(err.to_string()))?;
        info!(service = %self.service_name, "Tracer provider shut down");
        Ok(())
    }
}

impl Drop for TracerGuard {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            warn!(error = %err, "Tracer provider shutdown failed");
        }
    }
}
