use std::borrow::Cow;
use std::sync::{Arc, PoisonError, RwLock};

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{SpanRef, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};

const FALLBACK_TRACER: &str = "obskit";

struct GlobalTracer {
    tracer: Arc<BoxedTracer>,
    service_name: String,
}

static GLOBAL_TRACER: RwLock<Option<GlobalTracer>> = RwLock::new(None);

/// Records the tracer and service name used by the span helpers.
/// A later call replaces the earlier one.
pub fn setup_global_tracer(tracer: BoxedTracer, service_name: impl Into<String>) {
    let mut global = GLOBAL_TRACER
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *global = Some(GlobalTracer {
        tracer: Arc::new(tracer),
        service_name: service_name.into(),
    });
}

/// The installed tracer, or the provider's tracer under a generic name when
/// none was set up.
pub fn tracer() -> Arc<BoxedTracer> {
    let global = GLOBAL_TRACER.read().unwrap_or_else(PoisonError::into_inner);
    match global.as_ref() {
        Some(installed) => Arc::clone(&installed.tracer),
        None => Arc::new(global::tracer(FALLBACK_TRACER)),
    }
}

/// Empty until a tracer is set up.
pub fn service_name() -> String {
    GLOBAL_TRACER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(|installed| installed.service_name.clone())
        .unwrap_or_default()
}

/// Starts a span as a child of `parent` and returns the context carrying it.
pub fn new_span(parent: &Context, name: impl Into<Cow<'static, str>>) -> Context {
    let tracer = tracer();
    let span = tracer.start_with_context(name, parent);
    parent.with_span(span)
}

pub fn new_span_with_attributes(
    parent: &Context,
    name: impl Into<Cow<'static, str>>,
    attributes: impl IntoIterator<Item = KeyValue>,
) -> Context {
    let tracer = tracer();
    let span = tracer
        .span_builder(name)
        .with_attributes(attributes)
        .start_with_context(tracer.as_ref(), parent);
    parent.with_span(span)
}

/// The active span in `cx`; a no-op span when there is none.
pub fn span_from_context(cx: &Context) -> SpanRef<'_> {
    cx.span()
}
