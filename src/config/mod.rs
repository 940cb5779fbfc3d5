//! Configuration management module.

pub mod paths;
pub mod schema;
pub mod validation;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use paths::{CONFIG_ENV, PathError, Paths};
pub use schema::{Config, MetricsConfig, ServiceConfig};
pub use validation::{ValidationError, ValidationResult, ValidationWarning, validate_config};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Loads the config at `path`; a missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
