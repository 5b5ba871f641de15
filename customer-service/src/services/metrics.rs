//! Prometheus export and the ledger counters.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Must run once at startup before anything is recorded.
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }
}

pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// One ledger mutation, labelled `success` or `error`.
pub fn record_ledger_operation(operation: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("ledger_operations_total", "operation" => operation, "status" => status).increment(1);
}

pub fn record_rollover_run() {
    counter!("rollover_runs_total").increment(1);
}

/// Per-customer rollover outcome: `initialized`, `skipped` or `failed`.
pub fn record_rollover_customers(outcome: &'static str, count: u64) {
    if count > 0 {
        counter!("rollover_customers_total", "outcome" => outcome).increment(count);
    }
}
