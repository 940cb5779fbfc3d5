use std::net::IpAddr;

use crate::config::schema::Config;
use crate::logger::{CoreOptions, Output};
use crate::tracer::{SamplerKind, TracerOptions};

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

#[derive(Debug)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

pub fn validate_config(config: &Config) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError {
            field: "service.name".to_string(),
            message: "Service name cannot be empty".to_string(),
            suggestion: Some("Set service.name to the application name".to_string()),
        });
    }

    if !config.service.namespace.is_empty() && !is_metric_name(&config.service.namespace) {
        errors.push(ValidationError {
            field: "service.namespace".to_string(),
            message: format!(
                "Namespace {:?} is not a valid metric name prefix",
                config.service.namespace
            ),
            suggestion: Some("Use letters, digits and underscores only".to_string()),
        });
    }

    for (index, core) in config.logger.iter().enumerate() {
        validate_core(index, core, &mut errors, &mut warnings);
    }

    validate_metrics(config, &mut errors, &mut warnings);

    if let Some(ref tracer) = config.tracer {
        validate_tracer(tracer, &mut errors, &mut warnings);
    }

    ValidationResult { errors, warnings }
}

fn validate_core(
    index: usize,
    core: &CoreOptions,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<ValidationWarning>,
) {
    if let Err(err) = core.parsed_level() {
        errors.push(ValidationError {
            field: format!("logger[{index}].level"),
            message: err.to_string(),
            suggestion: None,
        });
    }

    if let Err(err) = core.parsed_encoding() {
        errors.push(ValidationError {
            field: format!("logger[{index}].encoding"),
            message: err.to_string(),
            suggestion: None,
        });
    }

    match core.output() {
        Output::File(path) => {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: format!("logger[{index}].output_path"),
                    message: "Output path cannot be empty".to_string(),
                    suggestion: Some("Use \"stdout\", \"stderr\" or a file path".to_string()),
                });
            } else if path.is_dir() {
                errors.push(ValidationError {
                    field: format!("logger[{index}].output_path"),
                    message: format!("Path is a directory: {}", path.display()),
                    suggestion: None,
                });
            }
        }
        Output::Stdout | Output::Stderr => {
            if core.rotate.is_some() {
                warnings.push(ValidationWarning {
                    field: format!("logger[{index}].rotate"),
                    message: "Rotation only applies to file outputs".to_string(),
                });
            }
        }
    }

    if core.time_format.is_some() && core.encoding.eq_ignore_ascii_case("console") {
        warnings.push(ValidationWarning {
            field: format!("logger[{index}].time_format"),
            message: "Console encoding uses a fixed time layout; time_format is ignored"
                .to_string(),
        });
    }
}

fn validate_metrics(
    config: &Config,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<ValidationWarning>,
) {
    let metrics = &config.metrics;
    if !metrics.enabled {
        return;
    }

    if metrics.bind.parse::<IpAddr>().is_err() {
        errors.push(ValidationError {
            field: "metrics.bind".to_string(),
            message: format!("Invalid bind address: {}", metrics.bind),
            suggestion: Some("Use an IP address such as 127.0.0.1".to_string()),
        });
    }

    if metrics.port == 0 {
        errors.push(ValidationError {
            field: "metrics.port".to_string(),
            message: "Metrics port must be between 1 and 65535".to_string(),
            suggestion: Some("Use a port between 1 and 65535".to_string()),
        });
    } else if metrics.port < 1024 {
        warnings.push(ValidationWarning {
            field: "metrics.port".to_string(),
            message: format!(
                "Port {} requires elevated privileges on most systems",
                metrics.port
            ),
        });
    }

    if !metrics.path.starts_with('/') {
        errors.push(ValidationError {
            field: "metrics.path".to_string(),
            message: "Metrics path must start with '/'".to_string(),
            suggestion: Some(format!("Use \"/{}\"", metrics.path.trim_start_matches('/'))),
        });
    }

    if metrics.bind == "0.0.0.0" {
        warnings.push(ValidationWarning {
            field: "metrics.bind".to_string(),
            message: "Metrics endpoint exposed on all interfaces".to_string(),
        });
    }
}

fn validate_tracer(
    tracer: &TracerOptions,
    errors: &mut Vec<ValidationError>,
    warnings: &mut Vec<ValidationWarning>,
) {
    if !tracer.enabled {
        return;
    }

    if tracer.host.trim().is_empty() {
        errors.push(ValidationError {
            field: "tracer.host".to_string(),
            message: "Collector host cannot be empty".to_string(),
            suggestion: Some("Set tracer.host, e.g. \"localhost\"".to_string()),
        });
    }

    if tracer.host.contains("://") {
        errors.push(ValidationError {
            field: "tracer.host".to_string(),
            message: "Collector host must not include a scheme".to_string(),
            suggestion: Some("Use a bare host name; the scheme is derived from the transport".to_string()),
        });
    }

    if tracer.port == 0 {
        errors.push(ValidationError {
            field: "tracer.port".to_string(),
            message: "Collector port must be between 1 and 65535".to_string(),
            suggestion: None,
        });
    }

    if matches!(tracer.sampler, SamplerKind::Ratio | SamplerKind::ParentRatio)
        && !(0.0..=1.0).contains(&tracer.sampling_ratio)
    {
        errors.push(ValidationError {
            field: "tracer.sampling_ratio".to_string(),
            message: format!(
                "Sampling ratio {} is outside 0.0..=1.0",
                tracer.sampling_ratio
            ),
            suggestion: None,
        });
    }

    if tracer.sampler == SamplerKind::AlwaysOff {
        warnings.push(ValidationWarning {
            field: "tracer.sampler".to_string(),
            message: "Tracer enabled but sampler drops every span".to_string(),
        });
    }

    if tracer.batch.max_export_batch_size > tracer.batch.max_queue_size {
        errors.push(ValidationError {
            field: "tracer.batch.max_export_batch_size".to_string(),
            message: "Export batch size cannot exceed the queue size".to_string(),
            suggestion: None,
        });
    }
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
