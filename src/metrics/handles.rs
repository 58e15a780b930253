//! Typed metric handles.
//!
//! A handle is a registry reference plus a full metric name. It never holds a
//! store entry, so every copy sees resets and deletions made through any other
//! copy or through the registry itself.
//!
//! Plain update methods (`inc`, `set`, `observe`, ...) never fail: errors are
//! logged and counted by the registry. The `try_*` variants return them instead.

use super::definition::MetricKind;
use super::histogram::HistogramSample;
use super::registry::Registry;
use crate::utils::errors::Result;

/// Monotonic counter.
#[derive(Debug, Clone)]
pub struct Counter {
    registry: Registry,
    name: String,
}

impl Counter {
    pub(crate) fn new(registry: Registry, name: String) -> Self {
        Self { registry, name }
    }

    /// Full metric name, prefix included.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increments by 1.
    pub fn inc(&self, label_values: &[&str]) {
        self.inc_by(1.0, label_values);
    }

    /// Increments by `value`; negative or non-finite values are rejected.
    pub fn inc_by(&self, value: f64, label_values: &[&str]) {
        if let Err(err) = self.try_inc_by(value, label_values) {
            self.registry.record_error(&err, "counter_inc");
        }
    }

    pub fn try_inc_by(&self, value: f64, label_values: &[&str]) -> Result<()> {
        self.registry.counter_inc(&self.name, value, label_values)
    }

    /// Current value, `None` if the series does not exist.
    pub fn get(&self, label_values: &[&str]) -> Option<f64> {
        self.registry.read_scalar(&self.name, label_values)
    }

    /// Removes one series.
    pub fn del(&self, label_values: &[&str]) {
        if let Err(err) = self.registry.delete_full(&self.name, Some(label_values)) {
            self.registry.record_error(&err, "counter_del");
        }
    }

    /// Removes every series.
    pub fn reset(&self) {
        if let Err(err) = self.registry.reset_full(&self.name) {
            self.registry.record_error(&err, "counter_reset");
        }
    }
}

/// Free-moving gauge.
#[derive(Debug, Clone)]
pub struct Gauge {
    registry: Registry,
    name: String,
}

impl Gauge {
    pub(crate) fn new(registry: Registry, name: String) -> Self {
        Self { registry, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Overwrites the stored value.
    pub fn set(&self, value: f64, label_values: &[&str]) {
        if let Err(err) = self.try_set(value, label_values) {
            self.registry.record_error(&err, "gauge_set");
        }
    }

    pub fn try_set(&self, value: f64, label_values: &[&str]) -> Result<()> {
        self.registry.gauge_set(&self.name, value, label_values)
    }

    pub fn inc(&self, label_values: &[&str]) {
        self.inc_by(1.0, label_values);
    }

    /// Adds `value`, which may be negative.
    pub fn inc_by(&self, value: f64, label_values: &[&str]) {
        if let Err(err) = self.try_inc_by(value, label_values) {
            self.registry.record_error(&err, "gauge_inc");
        }
    }

    pub fn try_inc_by(&self, value: f64, label_values: &[&str]) -> Result<()> {
        self.registry.gauge_add(&self.name, value, label_values)
    }

    pub fn dec(&self, label_values: &[&str]) {
        self.inc_by(-1.0, label_values);
    }

    pub fn dec_by(&self, value: f64, label_values: &[&str]) {
        self.inc_by(-value, label_values);
    }

    pub fn get(&self, label_values: &[&str]) -> Option<f64> {
        self.registry.read_scalar(&self.name, label_values)
    }

    pub fn del(&self, label_values: &[&str]) {
        if let Err(err) = self.registry.delete_full(&self.name, Some(label_values)) {
            self.registry.record_error(&err, "gauge_del");
        }
    }

    pub fn reset(&self) {
        if let Err(err) = self.registry.reset_full(&self.name) {
            self.registry.record_error(&err, "gauge_reset");
        }
    }
}

/// Cumulative-bucket histogram.
#[derive(Debug, Clone)]
pub struct Histogram {
    registry: Registry,
    name: String,
}

impl Histogram {
    pub(crate) fn new(registry: Registry, name: String) -> Self {
        Self { registry, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Records one observation; non-finite values are rejected.
    pub fn observe(&self, value: f64, label_values: &[&str]) {
        if let Err(err) = self.try_observe(value, label_values) {
            self.registry.record_error(&err, "histogram_observe");
        }
    }

    pub fn try_observe(&self, value: f64, label_values: &[&str]) -> Result<()> {
        self.registry.histogram_observe(&self.name, value, label_values)
    }

    /// Buckets, sum and count of one series.
    pub fn get(&self, label_values: &[&str]) -> Option<HistogramSample> {
        self.registry.read_histogram(&self.name, label_values)
    }

    pub fn del(&self, label_values: &[&str]) {
        if let Err(err) = self.registry.delete_full(&self.name, Some(label_values)) {
            self.registry.record_error(&err, "histogram_del");
        }
    }

    pub fn reset(&self) {
        if let Err(err) = self.registry.reset_full(&self.name) {
            self.registry.record_error(&err, "histogram_reset");
        }
    }
}

/// Any registered metric, for code that looks metrics up by name.
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Counter),
    Gauge(Gauge),
    Histogram(Histogram),
}

impl MetricHandle {
    pub(crate) fn from_kind(kind: MetricKind, registry: Registry, name: String) -> Self {
        match kind {
            MetricKind::Counter => MetricHandle::Counter(Counter::new(registry, name)),
            MetricKind::Gauge => MetricHandle::Gauge(Gauge::new(registry, name)),
            MetricKind::Histogram => MetricHandle::Histogram(Histogram::new(registry, name)),
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            MetricHandle::Counter(_) => MetricKind::Counter,
            MetricHandle::Gauge(_) => MetricKind::Gauge,
            MetricHandle::Histogram(_) => MetricKind::Histogram,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            MetricHandle::Counter(c) => c.name(),
            MetricHandle::Gauge(g) => g.name(),
            MetricHandle::Histogram(h) => h.name(),
        }
    }

    pub fn del(&self, label_values: &[&str]) {
        match self {
            MetricHandle::Counter(c) => c.del(label_values),
            MetricHandle::Gauge(g) => g.del(label_values),
            MetricHandle::Histogram(h) => h.del(label_values),
        }
    }

    pub fn reset(&self) {
        match self {
            MetricHandle::Counter(c) => c.reset(),
            MetricHandle::Gauge(g) => g.reset(),
            MetricHandle::Histogram(h) => h.reset(),
        }
    }
}
