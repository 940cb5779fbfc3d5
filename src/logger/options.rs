use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::logger::LoggerError;

pub const LEVEL_ERROR: &str = "ERROR";
pub const LEVEL_WARN: &str = "WARN";
pub const LEVEL_INFO: &str = "INFO";
pub const LEVEL_DEBUG: &str = "DEBUG";

pub const ENCODING_JSON: &str = "json";
pub const ENCODING_CONSOLE: &str = "console";

pub const OUTPUT_STDOUT: &str = "stdout";
pub const OUTPUT_STDERR: &str = "stderr";

/// Levels accepted in configuration, most severe first.
pub const ACCEPTED_LEVELS: [&str; 3] = [LEVEL_ERROR, LEVEL_INFO, LEVEL_DEBUG];
pub const ACCEPTED_ENCODINGS: [&str; 2] = [ENCODING_JSON, ENCODING_CONSOLE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => LEVEL_DEBUG,
            Self::Info => LEVEL_INFO,
            Self::Warn => LEVEL_WARN,
            Self::Error => LEVEL_ERROR,
        }
    }

    pub fn as_tracing(&self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            LEVEL_DEBUG => Ok(Self::Debug),
            LEVEL_INFO => Ok(Self::Info),
            LEVEL_WARN | "WARNING" => Ok(Self::Warn),
            LEVEL_ERROR => Ok(Self::Error),
            _ => Err(LoggerError::InvalidLevel {
                level: value.to_string(),
                accepted: ACCEPTED_LEVELS.join(" "),
            }),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Console,
    Json,
}

impl FromStr for Encoding {
    type Err = LoggerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            ENCODING_CONSOLE => Ok(Self::Console),
            ENCODING_JSON => Ok(Self::Json),
            _ => Err(LoggerError::InvalidEncoding {
                encoding: value.to_string(),
                accepted: ACCEPTED_ENCODINGS.join(" "),
            }),
        }
    }
}

/// Where a core writes its records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl Output {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            OUTPUT_STDOUT => Self::Stdout,
            OUTPUT_STDERR => Self::Stderr,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

/// Size based rotation for file outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateOptions {
    /// Maximum file size in megabytes before rotating (0 uses 100).
    /// Example: max_size_mb = 100
    pub max_size_mb: u64,
    /// Number of rotated files to keep (0 keeps all).
    /// Example: max_backups = 4
    pub max_backups: usize,
    /// Days to keep rotated files (0 keeps forever).
    /// Example: max_age_days = 7
    pub max_age_days: u64,
}

/// One logging sink: encoder, writer and minimum level.
///
/// Example:
/// ```toml
/// [[logger]]
/// output_path = "/var/log/app.log"
/// level = "INFO"
/// encoding = "json"
///
/// [logger.rotate]
/// max_size_mb = 100
/// max_backups = 4
/// max_age_days = 7
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreOptions {
    /// "stdout", "stderr" or a file path.
    /// Example: output_path = "stderr"
    pub output_path: String,
    /// Minimum level: ERROR, WARN, INFO or DEBUG.
    /// Example: level = "DEBUG"
    pub level: String,
    /// Record encoding: "console" or "json".
    /// Example: encoding = "console"
    pub encoding: String,
    /// strftime layout for JSON timestamps (RFC 3339 when unset).
    /// Example: time_format = "%Y-%m-%d %H:%M:%S"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
    /// Rotation settings for file outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotate: Option<RotateOptions>,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self {
            output_path: OUTPUT_STDERR.to_string(),
            level: LEVEL_DEBUG.to_string(),
            encoding: ENCODING_CONSOLE.to_string(),
            time_format: None,
            rotate: None,
        }
    }
}

impl CoreOptions {
    pub fn new(output_path: impl Into<String>, level: Level, encoding: Encoding) -> Self {
        Self {
            output_path: output_path.into(),
            level: level.as_str().to_string(),
            encoding: match encoding {
                Encoding::Console => ENCODING_CONSOLE.to_string(),
                Encoding::Json => ENCODING_JSON.to_string(),
            },
            ..Self::default()
        }
    }

    pub fn with_rotate(mut self, rotate: RotateOptions) -> Self {
        self.rotate = Some(rotate);
        self
    }

    pub fn with_time_format(mut self, layout: impl Into<String>) -> Self {
        self.time_format = Some(layout.into());
        self
    }

    pub fn parsed_level(&self) -> Result<Level, LoggerError> {
        self.level.parse()
    }

    pub fn parsed_encoding(&self) -> Result<Encoding, LoggerError> {
        self.encoding.parse()
    }

    pub fn output(&self) -> Output {
        Output::parse(&self.output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parse_is_case_insensitive() {
        assert_eq!("debug".parse::<Level>().unwrap(), Level::Debug);
        assert_eq!("Info".parse::<Level>().unwrap(), Level::Info);
        assert_eq!("ERROR".parse::<Level>().unwrap(), Level::Error);
        assert_eq!("warning".parse::<Level>().unwrap(), Level::Warn);
    }

    #[test]
    fn level_parse_error_lists_accepted_values() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "wrong logger level: verbose, instead [ERROR INFO DEBUG]"
        );
    }

    #[test]
    fn encoding_parse_rejects_unknown() {
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("console".parse::<Encoding>().unwrap(), Encoding::Console);
        let err = "xml".parse::<Encoding>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "wrong logger encoding: xml, instead [json console]"
        );
    }

    #[test]
    fn output_parse_maps_streams_and_paths() {
        assert_eq!(Output::parse("stdout"), Output::Stdout);
        assert_eq!(Output::parse("stderr"), Output::Stderr);
        assert_eq!(
            Output::parse("/tmp/app.log"),
            Output::File(PathBuf::from("/tmp/app.log"))
        );
    }

    #[test]
    fn default_core_is_stderr_debug_console() {
        let core = CoreOptions::default();
        assert_eq!(core.output(), Output::Stderr);
        assert_eq!(core.parsed_level().unwrap(), Level::Debug);
        assert_eq!(core.parsed_encoding().unwrap(), Encoding::Console);
        assert!(core.rotate.is_none());
    }
}
