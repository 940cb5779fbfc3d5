use std::path::PathBuf;

use anyhow::{Context, bail};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{load_config, validate_config};
use crate::metrics::MetricsServer;
use crate::telemetry::Telemetry;

pub async fn handle_serve(config_path: PathBuf, port: Option<u16>) -> anyhow::Result<()> {
    let mut config = load_config(&config_path)?;
    if let Some(port) = port {
        config.metrics.port = port;
    }

    let validation = validate_config(&config);
    if !validation.is_valid() {
        for err in &validation.errors {
            eprintln!("  - {}: {}", err.field, err.message);
        }
        bail!("Configuration invalid: {}", config_path.display());
    }

    let telemetry = Telemetry::init(&config).context("Failed to initialize telemetry")?;
    for warning in &validation.warnings {
        tracing::warn!(field = %warning.field, "{}", warning.message);
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    match MetricsServer::from_config(&config.metrics, telemetry.metrics(), shutdown.clone())? {
        Some(server) => server.start().await?,
        None => {
            info!("Metrics endpoint disabled; waiting for shutdown signal");
            shutdown.cancelled().await;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn wait_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => {
                error!(error = %err, "Failed to register SIGTERM handler");
                shutdown.cancel();
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM; initiating shutdown"),
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => info!("Received SIGINT; initiating shutdown"),
                Err(err) => error!(error = %err, "Failed to listen for SIGINT"),
            },
            _ = shutdown.cancelled() => return,
        }
    }

    #[cfg(not(unix))]
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Failed to listen for Ctrl-C");
    }

    shutdown.cancel();
}
