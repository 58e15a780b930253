//! Serializable view of registry contents.

use serde::Serialize;

use super::definition::{MetricDefinition, MetricKind};
use super::histogram::HistogramSample;
use super::labels;
use super::store::{MetricStore, StoreEntry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSnapshot {
    pub name: String,
    pub kind: MetricKind,
    pub description: Option<String>,
    pub label_names: Vec<String>,
    pub series: Vec<SeriesSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    pub labels: Vec<String>,
    pub value: SeriesValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesValue {
    Scalar(f64),
    Histogram(HistogramSample),
}

/// Copies one metric out of the store. Series that fail to decode are left out.
pub(crate) fn snapshot_metric(def: &MetricDefinition, store: &MetricStore) -> MetricSnapshot {
    let mut series = Vec::new();
    store.for_each(&def.name, |key, entry| {
        let Ok(values) = labels::decode(&def.name, key, def.arity()) else {
            return;
        };
        let value = match entry {
            StoreEntry::Scalar(v) => SeriesValue::Scalar(*v),
            StoreEntry::Histogram(h) => {
                SeriesValue::Histogram(HistogramSample::from_entry(&def.buckets, h))
            }
        };
        series.push(SeriesSnapshot {
            labels: values,
            value,
        });
    });

    MetricSnapshot {
        name: def.name.clone(),
        kind: def.kind,
        description: def.description.clone(),
        label_names: def.label_names.clone(),
        series,
    }
}
