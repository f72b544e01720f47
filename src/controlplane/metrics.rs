//! Facade operation metrics
//!
//! Registered on an injected [`Registry`] so each handler (and each test)
//! owns its own series.

use crate::error::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Outcome label values
pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_ERROR: &str = "error";
pub const OUTCOME_UNIMPLEMENTED: &str = "unimplemented";

/// Counters and latency histograms for facade operations
#[derive(Clone)]
pub struct ControlMetrics {
    registry: Registry,
    operations: IntCounterVec,
    duration: HistogramVec,
}

impl ControlMetrics {
    /// Create the metric families and register them on `registry`
    pub fn new(registry: Registry) -> Result<Self> {
        let operations = IntCounterVec::new(
            Opts::new(
                "storage_control_operations_total",
                "Facade operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "storage_control_operation_duration_seconds",
                "Duration of facade operations",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(operations.clone()))?;
        registry.register(Box::new(duration.clone()))?;

        Ok(Self {
            registry,
            operations,
            duration,
        })
    }

    /// Record one finished operation
    pub fn observe(&self, operation: &str, outcome: &str, elapsed: Duration) {
        self.operations
            .with_label_values(&[operation, outcome])
            .inc();
        self.duration
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64());
    }

    /// Number of recorded operations for a label pair
    pub fn count(&self, operation: &str, outcome: &str) -> u64 {
        self.operations
            .with_label_values(&[operation, outcome])
            .get()
    }

    /// Render all registered families in the text exposition format
    pub fn render(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
