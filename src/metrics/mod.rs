//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Instrumented operation latency and outcome
//! - Send attempts and the gas price offered
//! - Report results

mod instrument;

pub use instrument::{Instrument, NoopInstrument, PrometheusInstrument};

use crate::error::{ReporterError, ReporterResult};

use axum::{routing::get, Router};
use ethers::types::U256;
use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_histogram_vec, Counter,
    CounterVec, Encoder, Gauge, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Instrumented operations
    pub static ref OPERATION_DURATION: HistogramVec = register_histogram_vec!(
        "oracle_reporter_operation_duration_seconds",
        "Duration of instrumented operations",
        &["operation"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();

    pub static ref OPERATION_OUTCOME: CounterVec = register_counter_vec!(
        "oracle_reporter_operations_total",
        "Instrumented operations by outcome",
        &["operation", "outcome"]
    ).unwrap();

    // Transaction metrics
    pub static ref SEND_ATTEMPTS: Counter = register_counter!(
        "oracle_reporter_send_attempts_total",
        "Total transaction send attempts"
    ).unwrap();

    pub static ref ATTEMPT_GAS_PRICE: Gauge = register_gauge!(
        "oracle_reporter_attempt_gas_price_gwei",
        "Gas price offered by the most recent send attempt"
    ).unwrap();

    // Report metrics
    pub static ref REPORTS: CounterVec = register_counter_vec!(
        "oracle_reporter_reports_total",
        "Price reports by outcome",
        &["outcome"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> ReporterResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| ReporterError::Internal(format!("Metrics bind failed: {}", e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| ReporterError::Internal(format!("Metrics server failed: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

// Helper functions to record metrics

pub fn record_operation(operation: &str, success: bool, elapsed_secs: f64) {
    OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(elapsed_secs);
    OPERATION_OUTCOME
        .with_label_values(&[operation, outcome(success)])
        .inc();
}

pub fn record_send_attempt(gas_price: U256) {
    SEND_ATTEMPTS.inc();
    ATTEMPT_GAS_PRICE.set(wei_to_gwei(gas_price));
}

pub fn record_report(success: bool) {
    REPORTS.with_label_values(&[outcome(success)]).inc();
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

fn wei_to_gwei(wei: U256) -> f64 {
    let capped = wei.min(U256::from(u128::MAX)).as_u128();
    capped as f64 / 1e9
}
