// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_int_counter, register_int_counter_vec, register_int_gauge,
    register_histogram_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge,
    TextEncoder,
};

// --- Metric Statics ---
// Initialized exactly once by `install`. Until then every observation is dropped.

static CLIENT_CONNECTED: OnceCell<IntGauge> = OnceCell::new();
static OPERATIONS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static OPERATION_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static ENDORSEMENT_MISMATCHES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static HISTORY_DUPLICATES_DROPPED_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

impl ClientMetricsSink for PrometheusSink {
    fn observe_operation_duration(&self, operation: &'static str, duration_secs: f64) {
        if let Some(m) = OPERATION_DURATION_SECONDS.get() {
            m.with_label_values(&[operation]).observe(duration_secs);
        }
    }
    fn inc_operations_total(&self, operation: &'static str, outcome: &'static str) {
        if let Some(m) = OPERATIONS_TOTAL.get() {
            m.with_label_values(&[operation, outcome]).inc();
        }
    }
    fn inc_endorsement_mismatches(&self) {
        if let Some(m) = ENDORSEMENT_MISMATCHES_TOTAL.get() {
            m.inc();
        }
    }
    fn inc_history_duplicates_dropped(&self, count: u64) {
        if let Some(m) = HISTORY_DUPLICATES_DROPPED_TOTAL.get() {
            m.inc_by(count);
        }
    }
    fn set_connected(&self, connected: bool) {
        if let Some(m) = CLIENT_CONNECTED.get() {
            m.set(i64::from(connected));
        }
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        if let Some(m) = ERRORS_TOTAL.get() {
            m.with_label_values(&[kind, variant]).inc();
        }
    }
}

/// Registers all Prometheus collectors with the default registry and installs
/// `PrometheusSink` as the global sink. Calling it again returns the same sink
/// without re-registering.
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    static PROMETHEUS_SINK: PrometheusSink = PrometheusSink;
    static INSTALLED: OnceCell<()> = OnceCell::new();
    INSTALLED.get_or_try_init(register_collectors)?;
    let sink: &'static dyn MetricsSink = &PROMETHEUS_SINK;
    // Another backend may already be installed; it keeps receiving client metrics.
    let _ = SINK.set(sink);
    Ok(sink)
}

fn register_collectors() -> Result<(), prometheus::Error> {
    let _ = CLIENT_CONNECTED.set(register_int_gauge!(
        "ledger_client_connected",
        "1 while the client holds a live connection to the ledger network."
    )?);
    let _ = OPERATIONS_TOTAL.set(register_int_counter_vec!(
        "ledger_client_operations_total",
        "Total client operations, by operation and outcome.",
        &["operation", "outcome"]
    )?);
    let _ = OPERATION_DURATION_SECONDS.set(register_histogram_vec!(
        "ledger_client_operation_duration_seconds",
        "Latency of client operations, including network time.",
        &["operation"],
        exponential_buckets(0.001, 2.0, 15)?
    )?);
    let _ = ENDORSEMENT_MISMATCHES_TOTAL.set(register_int_counter!(
        "ledger_client_endorsement_mismatches_total",
        "Total queries whose endorsers returned different payloads."
    )?);
    let _ = HISTORY_DUPLICATES_DROPPED_TOTAL.set(register_int_counter!(
        "ledger_client_history_duplicates_dropped_total",
        "Total duplicate history entries dropped during reconstruction."
    )?);
    let _ = ERRORS_TOTAL.set(register_int_counter_vec!(
        "ledger_client_errors_total",
        "Total number of errors, categorized by kind and code.",
        &["kind", "variant"]
    )?);
    Ok(())
}

/// Renders every registered metric in the Prometheus text exposition format.
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
