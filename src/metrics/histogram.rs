//! Histogram bucketing.
//!
//! Buckets are cumulative: the count at index `i` is the number of observations
//! `<= bounds[i]`, and the trailing `+Inf` bucket always equals the total count.

use serde::Serialize;

use crate::utils::errors::{MetricError, Result};

/// Default latency buckets in seconds, 5ms to 10s.
///
/// This list is part of the exposition contract: dashboards built on default
/// histograms depend on these exact boundaries.
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.02, 0.025, 0.03, 0.05, 0.075, 0.1, 0.2, 0.25, 0.3, 0.4, 0.5, 0.75, 1.0, 1.5,
    2.0, 2.5, 3.0, 4.0, 5.0, 10.0,
];

/// Validates caller-supplied boundaries, falling back to [`DEFAULT_BUCKETS`].
///
/// A trailing `+Inf` is dropped because it is always implicit.
pub fn normalize_buckets(metric: &str, buckets: Option<&[f64]>) -> Result<Vec<f64>> {
    let invalid = |reason: String| MetricError::InvalidBuckets {
        metric: metric.to_string(),
        reason,
    };

    let mut bounds = match buckets {
        None => return Ok(DEFAULT_BUCKETS.to_vec()),
        Some(b) => b.to_vec(),
    };
    if bounds.last() == Some(&f64::INFINITY) {
        bounds.pop();
    }
    if bounds.is_empty() {
        return Err(invalid("at least one finite boundary is required".to_string()));
    }

    for (i, bound) in bounds.iter().enumerate() {
        if !bound.is_finite() {
            return Err(invalid(format!("boundary {} is not finite", bound)));
        }
        if i > 0 && bounds[i - 1] >= *bound {
            return Err(invalid(format!(
                "boundaries must be strictly ascending ({} >= {})",
                bounds[i - 1],
                bound
            )));
        }
    }
    Ok(bounds)
}

/// Stored state for one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramEntry {
    /// Cumulative counts, aligned with `bounds ++ [+Inf]`
    pub buckets: Vec<u64>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramEntry {
    /// Zero state for a histogram with `bound_count` finite boundaries.
    pub fn new(bound_count: usize) -> Self {
        Self {
            buckets: vec![0; bound_count + 1],
            sum: 0.0,
            count: 0,
        }
    }

    /// Records one observation. `bounds` must be the definition's boundaries.
    pub fn observe(&mut self, bounds: &[f64], value: f64) {
        for (bucket, bound) in self.buckets.iter_mut().zip(bounds) {
            if value <= *bound {
                *bucket += 1;
            }
        }
        if let Some(inf) = self.buckets.last_mut() {
            *inf += 1;
        }
        self.sum += value;
        self.count += 1;
    }

    /// Checks the cumulative invariants against the definition's boundaries.
    pub fn is_consistent(&self, bound_count: usize) -> bool {
        self.buckets.len() == bound_count + 1
            && self.buckets.windows(2).all(|w| w[0] <= w[1])
            && self.buckets.last() == Some(&self.count)
    }
}

/// Read-only view of one histogram series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSample {
    /// `(upper bound, cumulative count)` pairs, ending with `+Inf`
    pub buckets: Vec<(f64, u64)>,
    pub sum: f64,
    pub count: u64,
}

impl HistogramSample {
    pub(crate) fn from_entry(bounds: &[f64], entry: &HistogramEntry) -> Self {
        let buckets = bounds
            .iter()
            .copied()
            .chain(std::iter::once(f64::INFINITY))
            .zip(entry.buckets.iter().copied())
            .collect();
        Self {
            buckets,
            sum: entry.sum,
            count: entry.count,
        }
    }
}
