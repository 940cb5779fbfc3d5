use std::backtrace::Backtrace;
use std::fmt::Display;
use std::panic::Location;
use std::sync::OnceLock;

use tracing::Dispatch;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

use crate::logger::format::{ConsoleFormatter, JsonFormatter, trim_path};
use crate::logger::options::{CoreOptions, Encoding};
use crate::logger::writer::Sink;
use crate::logger::LoggerError;

pub type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

/// A set of tee'd cores behind one `tracing` dispatcher.
#[derive(Clone)]
pub struct Logger {
    dispatch: Dispatch,
    sinks: Vec<Sink>,
    cores: Vec<CoreOptions>,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("cores", &self.cores)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct LoggerBuilder {
    cores: Vec<CoreOptions>,
    layers: Vec<BoxedLayer>,
}

impl LoggerBuilder {
    pub fn core(mut self, options: CoreOptions) -> Self {
        self.cores.push(options);
        self
    }

    pub fn cores(mut self, options: impl IntoIterator<Item = CoreOptions>) -> Self {
        self.cores.extend(options);
        self
    }

    /// Attaches an extra layer that sees every event, e.g. an OpenTelemetry bridge.
    pub fn layer(mut self, layer: BoxedLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn build(self) -> Result<Logger, LoggerError> {
        self.try_build().map_err(|(err, _)| err)
    }

    /// Like [`LoggerBuilder::build`], but hands the extra layers back on failure.
    fn try_build(self) -> Result<Logger, (LoggerError, Vec<BoxedLayer>)> {
        let mut core_layers = Vec::with_capacity(self.cores.len());
        let mut sinks = Vec::with_capacity(self.cores.len());

        for options in &self.cores {
            match build_core(options) {
                Ok((layer, sink)) => {
                    core_layers.push(layer);
                    sinks.push(sink);
                }
                Err(err) => return Err((err, self.layers)),
            }
        }

        let mut layers = self.layers;
        layers.extend(core_layers);
        let subscriber = tracing_subscriber::registry().with(layers);
        Ok(Logger {
            dispatch: Dispatch::new(subscriber),
            sinks,
            cores: self.cores,
        })
    }
}

/// Encoder, writer and level filter for one core.
fn build_core(options: &CoreOptions) -> Result<(BoxedLayer, Sink), LoggerError> {
    let level = options.parsed_level()?;
    let encoding = options.parsed_encoding()?;
    let sink = Sink::open(&options.output(), options.rotate.as_ref())?;
    let filter = LevelFilter::from_level(level.as_tracing());

    let layer = match encoding {
        Encoding::Console => tracing_subscriber::fmt::layer()
            .with_ansi(sink.is_terminal_stream())
            .with_writer(sink.clone())
            .event_format(ConsoleFormatter)
            .with_filter(filter)
            .boxed(),
        Encoding::Json => tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(sink.clone())
            .event_format(JsonFormatter::new(options.time_format.clone()))
            .with_filter(filter)
            .boxed(),
    };

    Ok((layer, sink))
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    pub fn new(cores: impl IntoIterator<Item = CoreOptions>) -> Result<Self, LoggerError> {
        Self::builder().cores(cores).build()
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn cores(&self) -> &[CoreOptions] {
        &self.cores
    }

    /// Runs `f` with this logger as the thread's default subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Logs `message` with `err` and a backtrace at ERROR, then returns `err`.
    #[track_caller]
    pub fn with_error<E: Display>(&self, message: &str, err: E) -> E {
        let location = Location::caller();
        let caller = trim_path(location.file(), Some(location.line()));
        let stacktrace = Backtrace::force_capture();
        self.in_scope(|| {
            tracing::error!(
                caller = %caller,
                error = %err,
                stacktrace = %stacktrace,
                "{message}"
            );
        });
        err
    }

    /// Flushes every sink.
    pub fn sync(&self) {
        for sink in &self.sinks {
            if let Err(err) = sink.flush() {
                eprintln!("obskit: failed to flush log sink: {err}");
            }
        }
    }
}

/// Installs `logger` as the process-wide default. Only the first call succeeds.
pub fn setup_global_logger(logger: Logger) -> Result<&'static Logger, LoggerError> {
    tracing::dispatcher::set_global_default(logger.dispatch.clone())
        .map_err(|_| LoggerError::GlobalAlreadySet)?;
    Ok(GLOBAL_LOGGER.get_or_init(|| logger))
}

pub fn setup_global(
    cores: impl IntoIterator<Item = CoreOptions>,
) -> Result<&'static Logger, LoggerError> {
    setup_global_logger(Logger::new(cores)?)
}

/// Like [`setup_global`], but invalid cores fall back to the default console core.
/// Extra layers on `builder` are kept either way.
pub fn setup_global_or_default(
    builder: LoggerBuilder,
) -> Result<&'static Logger, LoggerError> {
    match builder.try_build() {
        Ok(logger) => setup_global_logger(logger),
        Err((err, layers)) => {
            let logger = LoggerBuilder {
                cores: vec![CoreOptions::default()],
                layers,
            }
            .build()?;
            let installed = setup_global_logger(logger)?;
            tracing::error!(error = %err, "Unable to create configured logger; using defaults");
            Ok(installed)
        }
    }
}

pub fn global() -> Option<&'static Logger> {
    GLOBAL_LOGGER.get()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::options::{Level, RotateOptions};
    use serde_json::Value;
    use std::fs;
    use tempfile::tempdir;

    fn json_file_core(path: &std::path::Path, level: Level) -> CoreOptions {
        CoreOptions::new(path.to_string_lossy(), level, Encoding::Json)
    }

    fn read_lines(path: &std::path::Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn json_file_core_writes_structured_fields() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        let core = json_file_core(&path, Level::Debug).with_rotate(RotateOptions {
            max_size_mb: 100,
            max_backups: 4,
            max_age_days: 7,
        });
        let logger = Logger::new([core]).unwrap();

        logger.in_scope(|| {
            tracing::debug!(string = "smileEveryday", integer = 300, "Info message");
        });
        logger.sync();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "Info message");
        assert_eq!(lines[0]["string"], "smileEveryday");
        assert_eq!(lines[0]["integer"], 300);
        assert_eq!(lines[0]["level"], "DEBUG");
    }

    #[test]
    fn core_level_filters_lower_records() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("errors.log");
        let logger = Logger::new([json_file_core(&path, Level::Error)]).unwrap();

        logger.in_scope(|| {
            tracing::debug!("dropped");
            tracing::info!("dropped too");
            tracing::error!("kept");
        });
        logger.sync();

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["message"], "kept");
    }

    #[test]
    fn cores_are_teed_with_independent_levels() {
        let temp = tempdir().unwrap();
        let all = temp.path().join("all.log");
        let errors = temp.path().join("errors.log");
        let logger = Logger::new([
            json_file_core(&all, Level::Debug),
            json_file_core(&errors, Level::Error),
        ])
        .unwrap();

        logger.in_scope(|| {
            tracing::info!("info record");
            tracing::error!("error record");
        });
        logger.sync();

        assert_eq!(read_lines(&all).len(), 2);
        let error_lines = read_lines(&errors);
        assert_eq!(error_lines.len(), 1);
        assert_eq!(error_lines[0]["message"], "error record");
    }

    #[test]
    fn invalid_level_is_rejected() {
        let core = CoreOptions {
            level: "LOUD".to_string(),
            ..CoreOptions::default()
        };
        let err = Logger::new([core]).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidLevel { .. }));
    }

    #[test]
    fn invalid_encoding_is_rejected() {
        let core = CoreOptions {
            encoding: "logfmt".to_string(),
            ..CoreOptions::default()
        };
        let err = Logger::new([core]).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidEncoding { .. }));
    }

    #[test]
    fn with_error_logs_stacktrace_and_returns_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.log");
        let logger = Logger::new([json_file_core(&path, Level::Debug)]).unwrap();

        let err = logger.with_error("request failed", std::io::Error::other("boom"));
        logger.sync();

        assert_eq!(err.to_string(), "boom");
        let lines = read_lines(&path);
        assert_eq!(lines[0]["level"], "ERROR");
        assert_eq!(lines[0]["message"], "request failed");
        assert_eq!(lines[0]["error"], "boom");
        assert!(lines[0]["stacktrace"].is_string());
        assert!(lines[0]["caller"].as_str().unwrap().starts_with("logger/setup.rs:"));
    }

    #[test]
    fn console_file_core_writes_plain_columns() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("console.log");
        let core = CoreOptions::new(path.to_string_lossy(), Level::Info, Encoding::Console);
        let logger = Logger::new([core]).unwrap();

        logger.in_scope(|| tracing::info!(port = 8080, "listening"));
        logger.sync();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(!contents.contains('\x1b'));
        assert!(contents.contains("\tINFO\t"));
        assert!(contents.contains("\tlistening\t{\"port\":8080}"));
    }

    #[test]
    fn empty_logger_discards_records() {
        let logger = Logger::new(Vec::new()).unwrap();
        logger.in_scope(|| tracing::error!("nowhere"));
        assert!(logger.cores().is_empty());
    }
}
