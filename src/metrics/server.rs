use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::MetricsConfig;
use crate::metrics::MetricsService;

/// Serves the scrape endpoint until its shutdown token is cancelled.
pub struct MetricsServer {
    bind_addr: SocketAddr,
    router: Router,
    shutdown: CancellationToken,
}

impl MetricsServer {
    /// Returns `None` when the endpoint is disabled in configuration.
    pub fn from_config(
        config: &MetricsConfig,
        service: &MetricsService,
        shutdown: CancellationToken,
    ) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        Ok(Some(Self::new(
            &config.bind,
            config.port,
            &config.path,
            service,
            shutdown,
        )?))
    }

    pub fn new(
        bind: &str,
        port: u16,
        path: &str,
        service: &MetricsService,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let ip: IpAddr = bind
            .parse()
            .with_context(|| format!("Invalid metrics bind address: {bind}"))?;
        let bind_addr = SocketAddr::new(ip, port);

        if bind == "0.0.0.0" {
            warn!(port, "Metrics endpoint binding to all interfaces (0.0.0.0)");
        }

        let router = service.router_at(path).layer(TraceLayer::new_for_http());

        Ok(Self {
            bind_addr,
            router,
            shutdown,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub async fn start(&self) -> Result<()> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind metrics endpoint to {}", self.bind_addr))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener
            .local_addr()
            .context("Failed to read bound metrics address")?;
        info!(address = %local_addr, "Metrics endpoint listening");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("Metrics endpoint shutting down");
            })
            .await
            .context("Metrics endpoint failed")?;

        info!("Metrics endpoint stopped");
        Ok(())
    }
}
