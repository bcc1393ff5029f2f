//! Metric instrument factories for taskgroup.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments come from the `"taskgroup"` meter; without a provider
//! they are no-ops.

use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for taskgroup instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("taskgroup")
}

/// Counter: items pushed through `Dispatcher::add`.
pub fn items_enqueued() -> Counter<u64> {
    meter()
        .u64_counter("taskgroup.items.enqueued")
        .with_description("Number of items enqueued")
        .build()
}

/// Counter: execution units launched.
pub fn units_started() -> Counter<u64> {
    meter()
        .u64_counter("taskgroup.units.started")
        .with_description("Number of execution units launched")
        .build()
}

/// Counter: execution units that returned.
/// Labels: `result` ("ok" | "error" | "panic").
pub fn units_finished() -> Counter<u64> {
    meter()
        .u64_counter("taskgroup.units.finished")
        .with_description("Number of execution units finished")
        .build()
}

/// Histogram: time spent inside the work callback, in milliseconds.
pub fn unit_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("taskgroup.unit.duration_ms")
        .with_description("Work callback duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: drive operations that returned.
/// Labels: `outcome` ("ok" | "canceled" | "error").
pub fn dispatch_terminal() -> Counter<u64> {
    meter()
        .u64_counter("taskgroup.dispatch.terminal")
        .with_description("Number of dispatcher runs by outcome")
        .build()
}

/// Instruments held by one dispatcher, built once at construction.
pub struct DispatchMetrics {
    pub items_enqueued: Counter<u64>,
    pub units_started: Counter<u64>,
    pub units_finished: Counter<u64>,
    pub unit_duration_ms: Histogram<f64>,
    pub dispatch_terminal: Counter<u64>,
    labels: Vec<KeyValue>,
}

impl DispatchMetrics {
    pub fn new(name: &str) -> Self {
        Self {
            items_enqueued: items_enqueued(),
            units_started: units_started(),
            units_finished: units_finished(),
            unit_duration_ms: unit_duration_ms(),
            dispatch_terminal: dispatch_terminal(),
            labels: vec![KeyValue::new("dispatcher", name.to_string())],
        }
    }

    /// Base labels shared by every measurement of this dispatcher.
    pub fn labels(&self) -> &[KeyValue] {
        &self.labels
    }

    /// Base labels plus one extra pair.
    pub fn labels_with(&self, key: &'static str, value: &'static str) -> Vec<KeyValue> {
        let mut labels = self.labels.clone();
        labels.push(KeyValue::new(key, value));
        labels
    }
}
