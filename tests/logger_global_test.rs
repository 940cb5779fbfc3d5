//! The process-wide logger can be installed once, so this binary holds a single test.

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use obskit::logger::{self, CoreOptions, Encoding, Level, Logger, LoggerError};
use tracing_subscriber::layer::Context;
use tracing_subscriber::{Layer, Registry};

struct CountingLayer(Arc<AtomicUsize>);

impl Layer<Registry> for CountingLayer {
    fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, Registry>) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_global_logger_falls_back_and_installs_once() {
    let invalid = CoreOptions {
        level: "LOUD".to_string(),
        ..CoreOptions::default()
    };
    let seen = Arc::new(AtomicUsize::new(0));
    let builder = Logger::builder()
        .core(invalid)
        .layer(Box::new(CountingLayer(Arc::clone(&seen))));
    let installed = logger::setup_global_or_default(builder).unwrap();

    assert_eq!(installed.cores(), &[CoreOptions::default()]);
    assert!(logger::global().is_some());

    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("late.log");
    let err = logger::setup_global([CoreOptions::new(
        path.to_string_lossy(),
        Level::Info,
        Encoding::Json,
    )])
    .unwrap_err();
    assert!(matches!(err, LoggerError::GlobalAlreadySet));

    let before = seen.load(Ordering::SeqCst);
    tracing::info!("goes to the fallback core");
    assert_eq!(seen.load(Ordering::SeqCst), before + 1);
    let contents = fs::read_to_string(&path).unwrap_or_default();
    assert!(contents.is_empty());
}
