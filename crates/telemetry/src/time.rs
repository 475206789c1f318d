// Path: crates/telemetry/src/time.rs
use crate::sinks::ClientMetricsSink;
use std::time::Instant;

/// Observes the latency of one client operation when dropped, on every exit path.
pub struct Timer<'a> {
    sink: &'a dyn ClientMetricsSink,
    operation: &'static str,
    start: Instant,
}

impl<'a> Timer<'a> {
    pub fn new(sink: &'a dyn ClientMetricsSink, operation: &'static str) -> Self {
        Self {
            sink,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_operation_duration(self.operation, self.start.elapsed().as_secs_f64());
    }
}
