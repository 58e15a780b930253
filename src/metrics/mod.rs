//! # Metrics Core
//!
//! In-process registry for counters, gauges and histograms, rendered to the
//! Prometheus text exposition format.
//!
//! ## Architecture
//! - **labels**: injective label-vector encoding and sanitization
//! - **store**: series storage keyed by metric name and label key
//! - **definition**: metric kinds, definitions, name validation
//! - **histogram**: bucket validation, default buckets, cumulative counts
//! - **registry**: registration, update routing, reset/delete, error counter
//! - **handles**: typed `Counter`/`Gauge`/`Histogram` views over the registry
//! - **render**: exposition text
//! - **snapshot**: serializable copy of registry contents
//! - **cycle**: init/update/render driver for push loops

pub mod cycle;
pub mod definition;
pub mod handles;
pub mod histogram;
pub mod labels;
pub mod registry;
pub mod render;
pub mod snapshot;
pub mod store;

pub use cycle::PushCycle;
pub use definition::{MetricDefinition, MetricKind};
pub use handles::{Counter, Gauge, Histogram, MetricHandle};
pub use histogram::{HistogramSample, DEFAULT_BUCKETS};
pub use labels::LabelKey;
pub use registry::Registry;
pub use snapshot::{MetricSnapshot, SeriesSnapshot, SeriesValue};
