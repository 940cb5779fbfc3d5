//! Structured logging on top of `tracing-subscriber`.
//!
//! A [`Logger`] is built from one or more [`CoreOptions`]. Each core picks an
//! encoder (console or JSON), a writer (stdout, stderr or a rotating file) and
//! a minimum level; every event is offered to every core.

pub mod color;
pub mod format;
pub mod options;
pub mod setup;
pub mod writer;

use std::io;
use std::path::PathBuf;

pub use color::{CallerAligner, Color};
pub use options::{CoreOptions, Encoding, Level, Output, RotateOptions};
pub use setup::{
    BoxedLayer, Logger, LoggerBuilder, global, setup_global, setup_global_logger,
    setup_global_or_default,
};
pub use writer::{RotatingFile, Sink};

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("wrong logger level: {level}, instead [{accepted}]")]
    InvalidLevel { level: String, accepted: String },

    #[error("wrong logger encoding: {encoding}, instead [{accepted}]")]
    InvalidEncoding { encoding: String, accepted: String },

    #[error("Failed to open log file {path}: {source}")]
    LogFileOpen { path: PathBuf, source: io::Error },

    #[error("A global logger is already installed")]
    GlobalAlreadySet,
}
