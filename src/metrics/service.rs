use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::routing::get;
use prometheus_client::encoding::{EncodeLabelSet, EncodeMetric};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::MetricType;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::{Metric, Registry};

use crate::metrics::MetricsError;
use crate::metrics::handler::metrics_handler;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

static GLOBAL_METRICS: OnceLock<MetricsService> = OnceLock::new();

/// Implemented by components that expose their own metrics.
///
/// ```rust,ignore
/// impl MetricableService for Cache {
///     fn register_metrics(&self, registrar: &mut Registrar<'_>) -> Result<(), MetricsError> {
///         registrar.register("cache_hits", "Cache hits", self.hits.clone())?;
///         registrar.register("cache_misses", "Cache misses", self.misses.clone())
///     }
/// }
/// ```
pub trait MetricableService {
    fn register_metrics(&self, registrar: &mut Registrar<'_>) -> Result<(), MetricsError>;
}

/// Registration surface handed to a [`MetricableService`].
pub struct Registrar<'a> {
    state: &'a mut RegistryState,
}

impl Registrar<'_> {
    pub fn register(
        &mut self,
        name: &str,
        help: &str,
        metric: impl Metric,
    ) -> Result<(), MetricsError> {
        self.state.register(name, help, metric)
    }
}

#[derive(Debug)]
struct RegistryState {
    registry: Registry,
    names: BTreeSet<String>,
    /// Every series name the registered metrics expose, suffixes included.
    series: BTreeSet<String>,
}

impl RegistryState {
    fn register(&mut self, name: &str, help: &str, metric: impl Metric) -> Result<(), MetricsError> {
        validate_name(name)?;
        let exposed = series_names(name, metric.metric_type());
        if self.names.contains(name) || exposed.iter().any(|series| self.series.contains(series)) {
            return Err(MetricsError::AlreadyRegistered(name.to_string()));
        }
        self.names.insert(name.to_string());
        self.series.extend(exposed);
        self.registry.register(name, help, metric);
        Ok(())
    }
}

/// Names a metric occupies in the exposition, e.g. a counter `jobs` emits `jobs_total`.
fn series_names(name: &str, metric_type: MetricType) -> Vec<String> {
    let suffixes: &[&str] = match metric_type {
        MetricType::Counter => &["_total"],
        MetricType::Info => &["_info"],
        MetricType::Histogram => &["_bucket", "_sum", "_count"],
        _ => &[],
    };
    std::iter::once(name.to_string())
        .chain(suffixes.iter().map(|suffix| format!("{name}{suffix}")))
        .collect()
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct BuildInfoLabels {
    version: String,
}

/// Process level gauges refreshed on every scrape.
#[derive(Clone, Debug)]
struct ProcessMetrics {
    started: Instant,
    start_time_seconds: Gauge<f64, AtomicU64>,
    uptime_seconds: Gauge<f64, AtomicU64>,
    build_info: Family<BuildInfoLabels, Gauge>,
}

impl ProcessMetrics {
    fn register(state: &mut RegistryState) -> Result<Self, MetricsError> {
        let metrics = Self {
            started: Instant::now(),
            start_time_seconds: Gauge::default(),
            uptime_seconds: Gauge::default(),
            build_info: Family::default(),
        };

        state.register(
            "process_start_time_seconds",
            "Start time of the process since unix epoch in seconds",
            metrics.start_time_seconds.clone(),
        )?;
        state.register(
            "process_uptime_seconds",
            "Seconds since the metrics service was created",
            metrics.uptime_seconds.clone(),
        )?;
        state.register(
            "build_info",
            "Build information",
            metrics.build_info.clone(),
        )?;

        let start = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs_f64())
            .unwrap_or_default();
        metrics.start_time_seconds.set(start);
        metrics
            .build_info
            .get_or_create(&BuildInfoLabels {
                version: BUILD_VERSION.to_string(),
            })
            .set(1);

        Ok(metrics)
    }

    fn refresh(&self) {
        self.uptime_seconds.set(self.started.elapsed().as_secs_f64());
    }
}

type Middleware = Arc<dyn Fn(Router) -> Router + Send + Sync>;

/// Prometheus registry plus the HTTP surface that exposes it.
#[derive(Clone)]
pub struct MetricsService {
    state: Arc<Mutex<RegistryState>>,
    process: ProcessMetrics,
    middlewares: Arc<RwLock<Vec<Middleware>>>,
}

impl fmt::Debug for MetricsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsService")
            .field("middlewares", &self.middlewares().len())
            .finish_non_exhaustive()
    }
}

impl MetricsService {
    /// Creates a registry; every metric name gets `namespace_` prepended when
    /// `namespace` is non-empty.
    pub fn new(namespace: &str) -> Result<Self, MetricsError> {
        let registry = if namespace.is_empty() {
            Registry::default()
        } else {
            validate_name(namespace)?;
            Registry::with_prefix(namespace)
        };
        let mut state = RegistryState {
            registry,
            names: BTreeSet::new(),
            series: BTreeSet::new(),
        };
        let process = ProcessMetrics::register(&mut state)?;

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            process,
            middlewares: Arc::default(),
        })
    }

    pub fn set_global(service: MetricsService) -> bool {
        GLOBAL_METRICS.set(service).is_ok()
    }

    pub fn global() -> Option<MetricsService> {
        GLOBAL_METRICS.get().cloned()
    }

    pub fn register(&self, name: &str, help: &str, metric: impl Metric) -> Result<(), MetricsError> {
        self.lock()?.register(name, help, metric)
    }

    /// Registers every metric `service` declares, stopping at the first error.
    pub fn register_service(&self, service: &impl MetricableService) -> Result<(), MetricsError> {
        let mut state = self.lock()?;
        let mut registrar = Registrar { state: &mut *state };
        service.register_metrics(&mut registrar)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lock()
            .map(|state| state.names.contains(name))
            .unwrap_or(false)
    }

    /// Wraps the scrape router; middlewares apply in the order they are added.
    ///
    /// Clones share the list, so middleware added through [`MetricsService::global`]
    /// applies to every router built afterwards.
    pub fn add_middleware(&self, middleware: impl Fn(Router) -> Router + Send + Sync + 'static) {
        self.middlewares
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(middleware));
    }

    /// Renders the registry in OpenMetrics text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        self.process.refresh();
        let state = self.lock()?;
        let mut buffer = String::new();
        encode(&mut buffer, &state.registry)?;
        Ok(buffer)
    }

    pub fn router(&self) -> Router {
        self.router_at(DEFAULT_METRICS_PATH)
    }

    pub fn router_at(&self, path: &str) -> Router {
        let router = Router::new()
            .route(path, get(metrics_handler))
            .with_state(self.clone());
        self.middlewares()
            .iter()
            .fold(router, |router, middleware| middleware(router))
    }

    fn middlewares(&self) -> Vec<Middleware> {
        self.middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, MetricsError> {
        self.state.lock().map_err(|_| MetricsError::Poisoned)
    }
}

fn validate_name(name: &str) -> Result<(), MetricsError> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == ':');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(MetricsError::InvalidName(name.to_string()))
    }
}
