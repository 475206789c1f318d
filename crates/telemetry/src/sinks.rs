// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use ledger_types::error::{ErrorCode, LedgerError};
use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns a static reference to the configured client metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn client_metrics() -> &'static dyn ClientMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns a static reference to the configured error metrics sink.
/// If no sink has been initialized, it returns a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Counts `err` on the global error sink, labeled by its stable code.
pub fn record_error(err: &LedgerError) {
    error_metrics().inc_error("ledger", err.code());
}

// --- Trait Definitions ---

/// A sink for metrics emitted by the ledger client façade.
pub trait ClientMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of a client operation (`invoke`, `query`, `query_history`, ...).
    fn observe_operation_duration(&self, operation: &'static str, duration_secs: f64);
    /// Increments the counter of completed operations, labeled by outcome (`ok` / `error`).
    fn inc_operations_total(&self, operation: &'static str, outcome: &'static str);
    /// Increments the counter of queries whose endorsers disagreed.
    fn inc_endorsement_mismatches(&self);
    /// Increments the counter of duplicate history entries dropped during reconstruction.
    fn inc_history_duplicates_dropped(&self, count: u64);
    /// Sets the gauge reporting whether the client holds a live connection.
    fn set_connected(&self, connected: bool);
}
impl ClientMetricsSink for NopSink {
    fn observe_operation_duration(&self, _operation: &'static str, _duration_secs: f64) {}
    fn inc_operations_total(&self, _operation: &'static str, _outcome: &'static str) {}
    fn inc_endorsement_mismatches(&self) {}
    fn inc_history_duplicates_dropped(&self, _count: u64) {}
    fn set_connected(&self, _connected: bool) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink: ClientMetricsSink + ErrorMetricsSink {}

impl<T> MetricsSink for T where T: ClientMetricsSink + ErrorMetricsSink {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timer;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct RecordingSink {
        durations: Mutex<Vec<&'static str>>,
    }

    impl ClientMetricsSink for RecordingSink {
        fn observe_operation_duration(&self, operation: &'static str, duration_secs: f64) {
            assert!(duration_secs >= 0.0);
            self.durations.lock().unwrap().push(operation);
        }
        fn inc_operations_total(&self, _operation: &'static str, _outcome: &'static str) {}
        fn inc_endorsement_mismatches(&self) {}
        fn inc_history_duplicates_dropped(&self, _count: u64) {}
        fn set_connected(&self, _connected: bool) {}
    }

    #[test]
    fn test_timer_observes_on_drop() {
        let sink = RecordingSink::default();
        {
            let _timer = Timer::new(&sink, "query");
        }
        assert_eq!(*sink.durations.lock().unwrap(), vec!["query"]);
    }

    #[test]
    fn test_uninstalled_sinks_are_noops() {
        record_error(&LedgerError::NotConnected);
        client_metrics().set_connected(true);
    }
}
