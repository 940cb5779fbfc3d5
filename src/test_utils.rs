use std::sync::Mutex;

/// Serialises tests that touch process environment variables.
pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialises tests that replace the global OpenTelemetry provider or tracer.
pub(crate) static TRACING_LOCK: Mutex<()> = Mutex::new(());
