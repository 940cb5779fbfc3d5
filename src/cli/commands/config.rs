use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};

use crate::config::{Config, Paths, load_config, validate_config};

/// The file a command acts on: `--config`, then `$OBSKIT_CONFIG`, then the platform default.
pub fn resolve_path(custom_path: Option<PathBuf>) -> PathBuf {
    custom_path.unwrap_or_else(Paths::config_file)
}

pub async fn handle_init(force: bool, config_path: PathBuf) -> anyhow::Result<()> {
    if config_path.exists() && !force && !confirm_overwrite(&config_path)? {
        println!("Aborted.");
        return Ok(());
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(&config_path, default_config_toml())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("\x1b[32mConfig created at {}\x1b[0m", config_path.display());
    println!("Check it with: obskit config validate");
    Ok(())
}

pub async fn handle_show(config_path: PathBuf, json: bool) -> anyhow::Result<()> {
    let config = load_config(&config_path)?;
    let rendered = if json {
        serde_json::to_string_pretty(&config).context("Failed to render config as JSON")?
    } else {
        toml::to_string_pretty(&config).context("Failed to render config as TOML")?
    };

    if !config_path.exists() {
        eprintln!(
            "No config file at {}; showing defaults",
            config_path.display()
        );
    }
    println!("{rendered}");
    Ok(())
}

pub async fn handle_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!(
            "No config file found at {}, will use defaults",
            config_path.display()
        );
    }

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            bail!("Configuration invalid");
        }
    };

    report(&config, &config_path)
}

fn report(config: &Config, config_path: &Path) -> anyhow::Result<()> {
    let result = validate_config(config);

    for warning in &result.warnings {
        println!("Warning: {}: {}", warning.field, warning.message);
    }

    if !result.is_valid() {
        for error in &result.errors {
            eprintln!("  - {}: {}", error.field, error.message);
            if let Some(suggestion) = &error.suggestion {
                eprintln!("    Suggestion: {suggestion}");
            }
        }
        bail!(
            "Configuration invalid: {} error(s) in {}",
            result.errors.len(),
            config_path.display()
        );
    }

    println!("Configuration valid: {}", config_path.display());
    Ok(())
}

fn confirm_overwrite(path: &Path) -> anyhow::Result<bool> {
    print!(
        "Config already exists at {}. Overwrite? [y/N] ",
        path.display()
    );
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let response = input.trim();
    Ok(response.eq_ignore_ascii_case("y") || response.eq_ignore_ascii_case("yes"))
}

pub fn default_config_toml() -> &'static str {
    r#"# obskit configuration file

# Service identity shared by logs, metrics and traces
[service]
name = "obskit"
# Prefix for metric names and traced service names (optional)
# namespace = "payments"
environment = "development"

# Logging cores; every record goes to every core whose level admits it.
# Without any [[logger]] entry a single stderr console core at DEBUG is used.
[[logger]]
# "stdout", "stderr" or a file path
output_path = "stderr"
# ERROR, WARN, INFO or DEBUG
level = "INFO"
# "console" or "json"
encoding = "console"

# [[logger]]
# output_path = "/var/log/obskit/app.log"
# level = "DEBUG"
# encoding = "json"
# time_format = "%Y-%m-%d %H:%M:%S"
#
# [logger.rotate]
# max_size_mb = 100
# max_backups = 4
# max_age_days = 7

# Prometheus scrape endpoint
[metrics]
enabled = true
bind = "127.0.0.1"
port = 9090
path = "/metrics"

# Span export over OTLP (optional)
# [tracer]
# enabled = true
# transport = "grpc"        # "grpc" (4317) or "http" (4318)
# host = "localhost"
# port = 4317
# sampler = "parent_ratio"  # always_on, always_off, ratio, parent_ratio
# sampling_ratio = 1.0
# timeout_secs = 10
#
# [tracer.batch]
# max_queue_size = 2048
# max_export_batch_size = 512
# scheduled_delay_ms = 5000
"#
}
