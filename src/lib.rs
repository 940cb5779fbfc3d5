pub mod cli;
pub mod config;
pub mod logger;
pub mod metrics;
pub mod telemetry;
pub mod tracer;

#[cfg(test)]
mod test_utils;
