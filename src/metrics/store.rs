//! Series storage shared by all metric kinds.
//!
//! Entries are keyed by `(metric name, LabelKey)`. Within one metric, series are
//! kept in a `BTreeMap` so iteration order is stable across render passes.

use std::collections::{BTreeMap, HashMap};

use super::histogram::HistogramEntry;
use super::labels::LabelKey;

/// Value stored for one series.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEntry {
    /// Counter or gauge value
    Scalar(f64),
    Histogram(HistogramEntry),
}

/// Map from metric name to its series.
#[derive(Debug, Default)]
pub struct MetricStore {
    series: HashMap<String, BTreeMap<LabelKey, StoreEntry>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str, key: &LabelKey) -> Option<&StoreEntry> {
        self.series.get(name).and_then(|entries| entries.get(key))
    }

    pub fn contains(&self, name: &str, key: &LabelKey) -> bool {
        self.get(name, key).is_some()
    }

    /// Returns the entry, materializing it with `zero` if absent.
    ///
    /// This is the only path that creates entries.
    pub fn get_or_create<F>(&mut self, name: &str, key: &LabelKey, zero: F) -> &mut StoreEntry
    where
        F: FnOnce() -> StoreEntry,
    {
        self.series
            .entry(name.to_string())
            .or_default()
            .entry(key.clone())
            .or_insert_with(zero)
    }

    /// Removes one series, returning whether it existed.
    pub fn delete(&mut self, name: &str, key: &LabelKey) -> bool {
        let Some(entries) = self.series.get_mut(name) else {
            return false;
        };
        let removed = entries.remove(key).is_some();
        if entries.is_empty() {
            self.series.remove(name);
        }
        removed
    }

    /// Removes every series of a metric, returning how many were dropped.
    pub fn delete_all(&mut self, name: &str) -> usize {
        self.series.remove(name).map_or(0, |entries| entries.len())
    }

    /// Visits every series of a metric in key order.
    pub fn for_each<F>(&self, name: &str, mut f: F)
    where
        F: FnMut(&LabelKey, &StoreEntry),
    {
        if let Some(entries) = self.series.get(name) {
            for (key, entry) in entries {
                f(key, entry);
            }
        }
    }

    /// Number of series stored for a metric.
    pub fn series_count(&self, name: &str) -> usize {
        self.series.get(name).map_or(0, |entries| entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::labels::encode;

    #[test]
    fn test_get_or_create_is_lazy() {
        let mut store = MetricStore::new();
        let key = encode(&["a"]);
        assert!(store.get("m", &key).is_none());

        *store.get_or_create("m", &key, || StoreEntry::Scalar(0.0)) = StoreEntry::Scalar(4.0);
        // The factory is not used once the entry exists.
        let entry = store.get_or_create("m", &key, || StoreEntry::Scalar(-1.0));
        assert_eq!(*entry, StoreEntry::Scalar(4.0));
        assert_eq!(store.series_count("m"), 1);
    }

    #[test]
    fn test_delete_and_delete_all() {
        let mut store = MetricStore::new();
        for v in ["a", "b", "c"] {
            store.get_or_create("m", &encode(&[v]), || StoreEntry::Scalar(1.0));
        }
        store.get_or_create("other", &LabelKey::empty(), || StoreEntry::Scalar(1.0));

        assert!(store.delete("m", &encode(&["b"])));
        assert!(!store.delete("m", &encode(&["b"])));
        assert!(!store.delete("missing", &encode(&["b"])));
        assert_eq!(store.series_count("m"), 2);

        assert_eq!(store.delete_all("m"), 2);
        assert_eq!(store.series_count("m"), 0);
        assert!(store.contains("other", &LabelKey::empty()));
    }

    #[test]
    fn test_for_each_visits_in_key_order() {
        let mut store = MetricStore::new();
        for v in ["b", "a", "c"] {
            store.get_or_create("m", &encode(&[v]), || StoreEntry::Scalar(0.0));
        }
        let mut seen = Vec::new();
        store.for_each("m", |key, _| seen.push(key.clone()));
        assert_eq!(seen, vec![encode(&["a"]), encode(&["b"]), encode(&["c"])]);
    }
}
