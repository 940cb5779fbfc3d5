//! Installs the global logger and metrics registry, so this binary holds a single test.

use std::fs;

use obskit::config::Config;
use obskit::logger::{CoreOptions, Encoding, Level};
use obskit::metrics::MetricsService;
use obskit::telemetry::Telemetry;
use serde_json::Value;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_init_wires_logger_and_metrics() {
    let temp = tempfile::tempdir().unwrap();
    let log_path = temp.path().join("logs").join("service.log");

    let mut config = Config::default();
    config.service.name = "billing".to_string();
    config.service.namespace = "shop".to_string();
    config.logger = vec![CoreOptions::new(
        log_path.to_string_lossy(),
        Level::Info,
        Encoding::Json,
    )];

    let telemetry = Telemetry::init(&config).unwrap();
    assert!(!telemetry.tracing_enabled());

    tracing::debug!("below the core level");
    tracing::info!(order_id = 7, "order placed");
    telemetry.logger().sync();

    let records: Vec<Value> = fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert!(records.iter().any(|r| r["message"] == "Telemetry initialized"));
    let order = records
        .iter()
        .find(|r| r["message"] == "order placed")
        .unwrap();
    assert_eq!(order["order_id"], 7);
    assert_eq!(order["level"], "INFO");
    assert!(records.iter().all(|r| r["message"] != "below the core level"));

    let global = MetricsService::global().unwrap();
    let exposition = global.encode().unwrap();
    assert!(exposition.contains("shop_process_uptime_seconds"));
    assert!(telemetry.metrics().encode().unwrap().contains("shop_build_info"));

    drop(telemetry);
}
