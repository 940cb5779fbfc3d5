//! Span context carried in message-queue headers as plain hex ids.

use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::trace::{SpanContext, SpanId, TraceContextExt, TraceFlags, TraceId, TraceState};

pub const SPAN_ID_HEADER: &str = "span-id";
pub const TRACE_ID_HEADER: &str = "trace-id";

/// Writes the span and trace ids of the recording span in `cx` into `headers`.
/// Returns false and leaves `headers` untouched when nothing is recording.
pub fn inject_headers(cx: &Context, headers: &mut dyn Injector) -> bool {
    let span = cx.span();
    if !span.is_recording() {
        return false;
    }

    let span_context = span.span_context();
    headers.set(SPAN_ID_HEADER, span_context.span_id().to_string());
    headers.set(TRACE_ID_HEADER, span_context.trace_id().to_string());
    true
}

/// Returns `cx` with a remote parent rebuilt from `headers`, or `cx` unchanged
/// when either id is missing or malformed.
pub fn extract_headers(cx: &Context, headers: &dyn Extractor) -> Context {
    let span_id = headers
        .get(SPAN_ID_HEADER)
        .and_then(|value| SpanId::from_hex(value).ok());
    let trace_id = headers
        .get(TRACE_ID_HEADER)
        .and_then(|value| TraceId::from_hex(value).ok());

    let (Some(span_id), Some(trace_id)) = (span_id, trace_id) else {
        return cx.clone();
    };

    let remote = SpanContext::new(
        trace_id,
        span_id,
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    );
    if !remote.is_valid() {
        return cx.clone();
    }
    cx.with_remote_span_context(remote)
}
