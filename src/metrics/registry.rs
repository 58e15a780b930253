//! # Metric Registry
//!
//! Owns every metric definition and the series store behind them. All handle
//! operations route through the registry, so `reset`/`delete` are observed by
//! every copy of a handle.
//!
//! ## Error policy
//!
//! - Registration errors are returned to the caller.
//! - Update errors (arity, unknown metric, type mismatch, invalid value,
//!   cardinality) are swallowed by the handle methods, logged with a cap, and
//!   counted on the built-in error counter.
//! - Rendering never fails; unreadable series are skipped and counted.
//!
//! ## Locking
//!
//! A single registry-wide mutex guards definitions and the store. Operations
//! are bounded by label cardinality and never block on I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::definition::{
    validate_label_names, validate_metric_name, MetricDefinition, MetricKind,
};
use super::handles::{Counter, Gauge, Histogram, MetricHandle};
use super::histogram::{normalize_buckets, HistogramEntry, HistogramSample};
use super::labels::{self, LabelKey};
use super::render;
use super::snapshot::{self, MetricSnapshot};
use super::store::{MetricStore, StoreEntry};
use crate::config::RegistryConfig;
use crate::utils::errors::{MetricError, Result};
use crate::{log_debug, log_info, log_warn};

const ERROR_METRIC_HELP: &str = "Number of internal metric registry errors";

struct RegistryInner {
    config: RegistryConfig,
    /// Definitions in registration order
    definitions: Vec<MetricDefinition>,
    /// Full name to position in `definitions`
    index: HashMap<String, usize>,
    store: MetricStore,
    /// Full name of the built-in error counter
    error_metric: String,
    logged_errors: usize,
}

impl RegistryInner {
    fn definition(&self, name: &str) -> Result<&MetricDefinition> {
        self.index
            .get(name)
            .map(|&i| &self.definitions[i])
            .ok_or_else(|| MetricError::UnknownMetric(name.to_string()))
    }

    fn insert_definition(&mut self, definition: MetricDefinition) {
        self.index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect();
    }

    /// Looks up a typed definition and encodes the label vector for it.
    fn resolve(
        &self,
        name: &str,
        kind: MetricKind,
        label_values: &[&str],
    ) -> Result<(MetricDefinition, LabelKey)> {
        let def = self.definition(name)?;
        def.check_kind(kind)?;
        def.check_arity(label_values.len())?;
        Ok((def.clone(), labels::encode(label_values)))
    }

    /// Fails if creating `key` would push the metric past its series limit.
    fn check_cardinality(&self, name: &str, key: &LabelKey) -> Result<()> {
        let limit = self.config.max_series_per_metric;
        if limit == 0 || name == self.error_metric || self.store.contains(name, key) {
            return Ok(());
        }
        if self.store.series_count(name) >= limit {
            return Err(MetricError::CardinalityLimit {
                metric: name.to_string(),
                limit,
            });
        }
        Ok(())
    }

    fn scalar_entry(&mut self, name: &str, key: &LabelKey) -> Result<&mut f64> {
        self.check_cardinality(name, key)?;
        match self
            .store
            .get_or_create(name, key, || StoreEntry::Scalar(0.0))
        {
            StoreEntry::Scalar(value) => Ok(value),
            StoreEntry::Histogram(_) => Err(MetricError::TypeMismatch {
                metric: name.to_string(),
                expected: "scalar",
                actual: "histogram",
            }),
        }
    }

    /// Refuses caller operations aimed at the built-in error counter.
    fn guard_builtin(&self, name: &str) -> Result<()> {
        if name == self.error_metric {
            return Err(MetricError::BuiltinMetric(name.to_string()));
        }
        Ok(())
    }

    fn bump_error_counter(&mut self, amount: f64) {
        let name = self.error_metric.clone();
        if let StoreEntry::Scalar(value) =
            self.store
                .get_or_create(&name, &LabelKey::empty(), || StoreEntry::Scalar(0.0))
        {
            *value += amount;
        }
    }
}

/// Cheaply cloneable handle to one registry.
///
/// Registries are independent: construct one per application instance and pass
/// it to the callbacks that declare and update metrics.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Registry")
            .field("prefix", &inner.config.prefix)
            .field("metrics", &inner.definitions.len())
            .finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry with the default configuration.
    pub fn new() -> Self {
        Self::build(RegistryConfig::default())
    }

    /// Creates a registry, validating the configured error counter name.
    pub fn with_config(config: RegistryConfig) -> Result<Self> {
        validate_metric_name(&format!("{}{}", config.prefix, config.error_metric_name))?;
        Ok(Self::build(config))
    }

    fn build(config: RegistryConfig) -> Self {
        let error_metric = format!("{}{}", config.prefix, config.error_metric_name);
        let mut inner = RegistryInner {
            config,
            definitions: Vec::new(),
            index: HashMap::new(),
            store: MetricStore::new(),
            error_metric: error_metric.clone(),
            logged_errors: 0,
        };
        inner.insert_definition(MetricDefinition {
            name: error_metric,
            kind: MetricKind::Counter,
            description: Some(ERROR_METRIC_HELP.to_string()),
            label_names: Vec::new(),
            buckets: Vec::new(),
        });
        // The error counter is always exposed, even before the first error.
        inner.bump_error_counter(0.0);

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Applies the configured prefix to a caller-facing name.
    pub fn full_name(&self, name: &str) -> String {
        format!("{}{}", self.lock().config.prefix, name)
    }

    pub fn config(&self) -> RegistryConfig {
        self.lock().config.clone()
    }

    // =========================================================================
    // REGISTRATION
    // =========================================================================

    fn register(
        &self,
        name: &str,
        kind: MetricKind,
        description: Option<&str>,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) -> Result<String> {
        let mut inner = self.lock();
        let full_name = format!("{}{}", inner.config.prefix, name);
        inner.guard_builtin(&full_name)?;
        validate_metric_name(&full_name)?;

        let label_names: Vec<String> = label_names.iter().map(|s| s.to_string()).collect();
        validate_label_names(&full_name, kind, &label_names)?;
        let buckets = match kind {
            MetricKind::Histogram => normalize_buckets(&full_name, buckets)?,
            MetricKind::Counter | MetricKind::Gauge => Vec::new(),
        };

        let definition = MetricDefinition {
            name: full_name.clone(),
            kind,
            description: description.filter(|d| !d.is_empty()).map(str::to_string),
            label_names,
            buckets,
        };

        if let Ok(existing) = inner.definition(&full_name) {
            if *existing == definition {
                return Ok(full_name);
            }
            log_warn!(
                "Metrics Registration",
                &format!("Conflicting re-registration of {}", full_name),
                "duplicate_metric"
            );
            return Err(MetricError::DuplicateMetric(full_name));
        }

        log_debug!(
            "Metrics Registration",
            &format!("Registered {} {}", kind, full_name),
            "metric_registered"
        );
        inner.insert_definition(definition);
        Ok(full_name)
    }

    /// Registers (or re-obtains) a counter.
    ///
    /// Registering the same name with an identical definition is a no-op that
    /// returns an equivalent handle, so declarations can live in a per-cycle
    /// init callback.
    pub fn register_counter(
        &self,
        name: &str,
        description: Option<&str>,
        label_names: &[&str],
    ) -> Result<Counter> {
        let full = self.register(name, MetricKind::Counter, description, label_names, None)?;
        Ok(Counter::new(self.clone(), full))
    }

    pub fn register_gauge(
        &self,
        name: &str,
        description: Option<&str>,
        label_names: &[&str],
    ) -> Result<Gauge> {
        let full = self.register(name, MetricKind::Gauge, description, label_names, None)?;
        Ok(Gauge::new(self.clone(), full))
    }

    /// Registers a histogram. `None` buckets select [`DEFAULT_BUCKETS`].
    ///
    /// [`DEFAULT_BUCKETS`]: super::histogram::DEFAULT_BUCKETS
    pub fn register_histogram(
        &self,
        name: &str,
        description: Option<&str>,
        label_names: &[&str],
        buckets: Option<&[f64]>,
    ) -> Result<Histogram> {
        let full = self.register(
            name,
            MetricKind::Histogram,
            description,
            label_names,
            buckets,
        )?;
        Ok(Histogram::new(self.clone(), full))
    }

    /// Returns a handle for an already registered metric.
    pub fn get(&self, name: &str) -> Option<MetricHandle> {
        let full_name = self.full_name(name);
        let kind = self.lock().definition(&full_name).ok()?.kind;
        Some(MetricHandle::from_kind(kind, self.clone(), full_name))
    }

    /// Names of all registered metrics in registration order.
    pub fn metric_names(&self) -> Vec<String> {
        self.lock()
            .definitions
            .iter()
            .map(|def| def.name.clone())
            .collect()
    }

    // =========================================================================
    // RESET / DELETE
    // =========================================================================

    /// Clears every series of a metric, keeping its definition.
    pub fn reset_metric(&self, name: &str) -> Result<()> {
        self.reset_full(&self.full_name(name))
    }

    pub(crate) fn reset_full(&self, full_name: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.guard_builtin(full_name)?;
        inner.definition(full_name)?;
        let removed = inner.store.delete_all(full_name);
        log_debug!(
            "Metrics Reset",
            &format!("Reset {} ({} series dropped)", full_name, removed),
            "metric_reset"
        );
        Ok(())
    }

    /// Deletes one series.
    ///
    /// Unlabeled metrics take `None` (or an empty vector). Labeled metrics
    /// require their label values; `None` fails with `MissingLabels`.
    pub fn delete_metric(&self, name: &str, label_values: Option<&[&str]>) -> Result<()> {
        self.delete_full(&self.full_name(name), label_values)
    }

    pub(crate) fn delete_full(&self, full_name: &str, label_values: Option<&[&str]>) -> Result<()> {
        let mut inner = self.lock();
        inner.guard_builtin(full_name)?;
        let def = inner.definition(full_name)?;
        let key = match label_values {
            Some(values) => {
                def.check_arity(values.len())?;
                labels::encode(values)
            }
            None if def.arity() == 0 => LabelKey::empty(),
            None => return Err(MetricError::MissingLabels(full_name.to_string())),
        };
        inner.store.delete(full_name, &key);
        Ok(())
    }

    /// Removes a definition and all of its series.
    ///
    /// The built-in error counter cannot be removed, reset, deleted,
    /// re-registered or incremented by callers.
    pub fn unregister(&self, name: &str) -> Result<()> {
        let full_name = self.full_name(name);
        let mut inner = self.lock();
        inner.guard_builtin(&full_name)?;
        let position = *inner
            .index
            .get(&full_name)
            .ok_or_else(|| MetricError::UnknownMetric(full_name.clone()))?;
        inner.definitions.remove(position);
        inner.rebuild_index();
        inner.store.delete_all(&full_name);
        log_info!(
            "Metrics Registration",
            &format!("Unregistered {}", full_name),
            "metric_unregistered"
        );
        Ok(())
    }

    // =========================================================================
    // UPDATES (full names, called by handles)
    // =========================================================================

    pub(crate) fn counter_inc(&self, name: &str, value: f64, label_values: &[&str]) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(MetricError::InvalidValue {
                metric: name.to_string(),
                value,
                reason: "counter increments must be finite and non-negative",
            });
        }
        let mut inner = self.lock();
        inner.guard_builtin(name)?;
        let (_, key) = inner.resolve(name, MetricKind::Counter, label_values)?;
        *inner.scalar_entry(name, &key)? += value;
        Ok(())
    }

    pub(crate) fn gauge_set(&self, name: &str, value: f64, label_values: &[&str]) -> Result<()> {
        let mut inner = self.lock();
        let (_, key) = inner.resolve(name, MetricKind::Gauge, label_values)?;
        *inner.scalar_entry(name, &key)? = value;
        Ok(())
    }

    pub(crate) fn gauge_add(&self, name: &str, value: f64, label_values: &[&str]) -> Result<()> {
        let mut inner = self.lock();
        let (_, key) = inner.resolve(name, MetricKind::Gauge, label_values)?;
        *inner.scalar_entry(name, &key)? += value;
        Ok(())
    }

    pub(crate) fn histogram_observe(
        &self,
        name: &str,
        value: f64,
        label_values: &[&str],
    ) -> Result<()> {
        if !value.is_finite() {
            return Err(MetricError::InvalidValue {
                metric: name.to_string(),
                value,
                reason: "observations must be finite",
            });
        }
        let mut inner = self.lock();
        let (def, key) = inner.resolve(name, MetricKind::Histogram, label_values)?;
        inner.check_cardinality(name, &key)?;
        let bound_count = def.buckets.len();
        match inner.store.get_or_create(name, &key, || {
            StoreEntry::Histogram(HistogramEntry::new(bound_count))
        }) {
            StoreEntry::Histogram(entry) => {
                entry.observe(&def.buckets, value);
                Ok(())
            }
            StoreEntry::Scalar(_) => Err(MetricError::TypeMismatch {
                metric: name.to_string(),
                expected: "histogram",
                actual: "scalar",
            }),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub(crate) fn read_scalar(&self, name: &str, label_values: &[&str]) -> Option<f64> {
        let inner = self.lock();
        inner.definition(name).ok()?.check_arity(label_values.len()).ok()?;
        match inner.store.get(name, &labels::encode(label_values))? {
            StoreEntry::Scalar(value) => Some(*value),
            StoreEntry::Histogram(_) => None,
        }
    }

    pub(crate) fn read_histogram(&self, name: &str, label_values: &[&str]) -> Option<HistogramSample> {
        let inner = self.lock();
        let def = inner.definition(name).ok()?;
        def.check_arity(label_values.len()).ok()?;
        match inner.store.get(name, &labels::encode(label_values))? {
            StoreEntry::Histogram(entry) => Some(HistogramSample::from_entry(&def.buckets, entry)),
            StoreEntry::Scalar(_) => None,
        }
    }

    /// Current value of the built-in error counter.
    pub fn error_count(&self) -> f64 {
        let inner = self.lock();
        match inner.store.get(&inner.error_metric, &LabelKey::empty()) {
            Some(StoreEntry::Scalar(value)) => *value,
            _ => 0.0,
        }
    }

    /// Counts and logs a swallowed update error.
    pub fn record_error(&self, err: &MetricError, operation: &str) {
        let mut inner = self.lock();
        inner.bump_error_counter(1.0);
        inner.logged_errors += 1;
        if inner.logged_errors <= inner.config.max_logged_errors {
            log_warn!(
                "Metrics",
                &format!("{} failed: {}", operation, err),
                err.kind()
            );
        }
    }

    // =========================================================================
    // EXPOSITION
    // =========================================================================

    /// Renders every metric in Prometheus text exposition format.
    ///
    /// The pass itself is read-only. Series that cannot be rendered are skipped;
    /// they are added to the error counter once the text is complete, so the
    /// increment shows up in the next render.
    pub fn render_exposition(&self) -> String {
        let mut inner = self.lock();
        let mut output = String::new();
        let mut skipped = 0usize;
        for def in &inner.definitions {
            skipped += render::render_metric(def, &inner.store, &mut output);
        }

        if skipped > 0 {
            inner.bump_error_counter(skipped as f64);
            log_warn!(
                "Metrics Exposition",
                &format!("Skipped {} unrenderable series", skipped),
                "render_skipped"
            );
        }
        output
    }

    /// Serializable view of every metric and series.
    pub fn snapshot(&self) -> Vec<MetricSnapshot> {
        let inner = self.lock();
        inner
            .definitions
            .iter()
            .map(|def| snapshot::snapshot_metric(def, &inner.store))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn corrupt_entry_for_test(&self, name: &str, key: LabelKey, entry: StoreEntry) {
        let mut inner = self.lock();
        *inner.store.get_or_create(name, &key, || StoreEntry::Scalar(0.0)) = entry;
    }
}
