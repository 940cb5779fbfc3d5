//! One-call bootstrap of the logger, metrics registry and tracer from [`Config`].

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::Config;
use crate::logger::{self, Logger, LoggerError};
use crate::metrics::{MetricsError, MetricsService};
use crate::tracer::{self, TracerError, TracerGuard};

/// Keeps exporter and transport internals out of exported spans.
const OTEL_LAYER_DIRECTIVES: &str =
    "debug,h2=off,hyper=off,hyper_util=off,tonic=off,tower=off,reqwest=off,opentelemetry=off";

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Tracer(#[from] TracerError),
}

pub struct Telemetry;

impl Telemetry {
    /// Sets up the tracer (when configured), then the global logger with the
    /// tracer bridged in, then the global metrics registry.
    ///
    /// Must run inside a Tokio runtime when a tracer is enabled.
    pub fn init(config: &Config) -> Result<TelemetryGuard, TelemetryError> {
        let service = &config.service;

        let tracer = match config.tracer.as_ref().filter(|options| options.enabled) {
            Some(options) => Some(tracer::setup_tracer_provider(
                options,
                &service.namespace,
                &service.name,
                &service.environment,
            )?),
            None => None,
        };

        let mut builder = Logger::builder().cores(config.logger_cores());
        if let Some(ref guard) = tracer {
            builder = builder.layer(
                guard
                    .tracing_layer::<Registry>()
                    .with_filter(EnvFilter::new(OTEL_LAYER_DIRECTIVES))
                    .boxed(),
            );
        }
        let logger = logger::setup_global_or_default(builder)?;

        let metrics = MetricsService::new(&service.namespace)?;
        if !MetricsService::set_global(metrics.clone()) {
            warn!("Global metrics service already set; keeping the existing one");
        }

        info!(
            service = %service.name,
            namespace = %service.namespace,
            environment = %service.environment,
            cores = logger.cores().len(),
            tracing = tracer.is_some(),
            "Telemetry initialized"
        );

        Ok(TelemetryGuard {
            logger,
            tracer,
            metrics: MetricsService::global().unwrap_or(metrics),
        })
    }
}

/// Flushes log sinks and shuts the tracer down when dropped.
#[must_use = "dropping the guard flushes logs and stops span export"]
pub struct TelemetryGuard {
    logger: &'static Logger,
    tracer: Option<TracerGuard>,
    metrics: MetricsService,
}

impl TelemetryGuard {
    pub fn logger(&self) -> &'static Logger {
        self.logger
    }

    pub fn metrics(&self) -> &MetricsService {
        &self.metrics
    }

    pub fn tracing_enabled(&self) -> bool {
        self.tracer.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(mut tracer) = self.tracer.take() {
            if let Err(err) = tracer.shutdown() {
                warn!(error = %err, "Tracer shutdown failed");
            }
        }
        self.logger.sync();
    }
}
