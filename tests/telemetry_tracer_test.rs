//! Installs the global logger and tracer provider, so this binary holds a single test.

use std::time::Duration;

use obskit::config::Config;
use obskit::telemetry::Telemetry;
use obskit::tracer::{self, SamplerKind, TracerOptions, Transport};
use opentelemetry::trace::TraceContextExt;
use tracing_opentelemetry::OpenTelemetrySpanExt;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_init_bridges_spans_and_shuts_tracer_down() {
    let mut config = Config::default();
    config.service.name = "billing".to_string();
    config.service.namespace = "shop".to_string();
    // Nothing listens on port 1; exports fail fast and are dropped.
    config.tracer = Some(TracerOptions {
        transport: Transport::Grpc,
        host: "127.0.0.1".to_string(),
        port: 1,
        sampler: SamplerKind::AlwaysOn,
        timeout_secs: 1,
        ..TracerOptions::default()
    });

    let telemetry = Telemetry::init(&config).unwrap();
    assert!(telemetry.tracing_enabled());
    assert_eq!(tracer::service_name(), "shop.billing");

    let span = tracing::info_span!("checkout", order_id = 7);
    let cx = span.context();
    let span_context = cx.span().span_context().clone();
    assert!(span_context.is_valid());
    assert!(span_context.is_sampled());

    let child = span.in_scope(|| tracing::info_span!("charge_card"));
    let child_context = child.context().span().span_context().clone();
    assert!(child_context.is_valid());
    assert_eq!(child_context.trace_id(), span_context.trace_id());
    drop(child);
    drop(span);

    let internal = tracing::info_span!(target: "tonic", "transport internals");
    assert!(!internal.context().span().span_context().is_valid());
    drop(internal);

    let shutdown = tokio::task::spawn_blocking(move || drop(telemetry));
    tokio::time::timeout(Duration::from_secs(15), shutdown)
        .await
        .expect("telemetry shutdown hung")
        .unwrap();
}
