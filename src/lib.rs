//! In-process metrics registry with Prometheus text exposition.
//!
//! Applications register counters, gauges and histograms on a [`Registry`],
//! update them with label values, and periodically call
//! [`Registry::render_exposition`] to obtain a payload for a push transport.
//!
//! ```
//! use push_registry::Registry;
//!
//! let registry = Registry::new();
//! let requests = registry
//!     .register_counter("requests_total", Some("Handled requests"), &["host", "status"])
//!     .unwrap();
//! requests.inc(&["a", "200"]);
//!
//! let payload = registry.render_exposition();
//! assert!(payload.contains("requests_total{host=\"a\",status=\"200\"} 1"));
//! ```

pub mod config;
pub mod metrics;
pub mod utils;

pub use config::{PushSettings, RegistryConfig};
pub use metrics::{
    Counter, Gauge, Histogram, HistogramSample, MetricHandle, MetricKind, MetricSnapshot,
    PushCycle, Registry, DEFAULT_BUCKETS,
};
pub use utils::errors::{MetricError, Result};
