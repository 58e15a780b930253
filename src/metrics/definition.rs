//! Metric definitions and name validation.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::utils::errors::{MetricError, Result};

lazy_static! {
    static ref METRIC_NAME_RE: Regex =
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("metric name pattern is valid");
    static ref LABEL_NAME_RE: Regex =
        Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("label name pattern is valid");
}

/// Label name reserved for histogram bucket boundaries
pub const BUCKET_LABEL: &str = "le";

/// The closed set of metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    /// Name used on the `# TYPE` line.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything declared for a metric at registration time.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    /// Full name, prefix included
    pub name: String,
    pub kind: MetricKind,
    pub description: Option<String>,
    pub label_names: Vec<String>,
    /// Finite boundaries; empty for counters and gauges
    pub buckets: Vec<f64>,
}

impl MetricDefinition {
    pub fn arity(&self) -> usize {
        self.label_names.len()
    }

    /// Fails with `LabelArity` unless `actual` matches the declared label count.
    pub fn check_arity(&self, actual: usize) -> Result<()> {
        if actual != self.arity() {
            return Err(MetricError::LabelArity {
                metric: self.name.clone(),
                expected: self.arity(),
                actual,
            });
        }
        Ok(())
    }

    /// Fails with `TypeMismatch` unless the definition has the expected kind.
    pub fn check_kind(&self, expected: MetricKind) -> Result<()> {
        if self.kind != expected {
            return Err(MetricError::TypeMismatch {
                metric: self.name.clone(),
                expected: expected.as_str(),
                actual: self.kind.as_str(),
            });
        }
        Ok(())
    }
}

pub fn validate_metric_name(name: &str) -> Result<()> {
    if METRIC_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(MetricError::InvalidName(name.to_string()))
    }
}

/// Checks label names for syntax, reserved prefixes and duplicates.
pub fn validate_label_names(metric: &str, kind: MetricKind, label_names: &[String]) -> Result<()> {
    let invalid = |label: &str, reason: &'static str| MetricError::InvalidLabelName {
        metric: metric.to_string(),
        label: label.to_string(),
        reason,
    };

    let mut seen = HashSet::new();
    for label in label_names {
        if !LABEL_NAME_RE.is_match(label) {
            return Err(invalid(label, "must match [a-zA-Z_][a-zA-Z0-9_]*"));
        }
        if label.starts_with("__") {
            return Err(invalid(label, "names starting with __ are reserved"));
        }
        if kind == MetricKind::Histogram && label == BUCKET_LABEL {
            return Err(invalid(label, "le is reserved for histogram buckets"));
        }
        if !seen.insert(label.as_str()) {
            return Err(invalid(label, "declared more than once"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_metric_name_validation() {
        for ok in ["requests_total", "_private", "a1", "A_B_9"] {
            assert!(validate_metric_name(ok).is_ok(), "{}", ok);
        }
        for bad in ["", "9lives", "with-dash", "with space", "dots.in.name", "colon:name"] {
            assert_eq!(
                validate_metric_name(bad),
                Err(MetricError::InvalidName(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_label_name_validation() {
        assert!(validate_label_names("m", MetricKind::Counter, &names(&["host", "status"])).is_ok());
        assert!(validate_label_names("m", MetricKind::Counter, &names(&["le"])).is_ok());
        assert!(validate_label_names("m", MetricKind::Histogram, &names(&["le"])).is_err());
        assert!(validate_label_names("m", MetricKind::Gauge, &names(&["__name"])).is_err());
        assert!(validate_label_names("m", MetricKind::Gauge, &names(&["a", "a"])).is_err());
        assert!(validate_label_names("m", MetricKind::Gauge, &names(&["1a"])).is_err());
    }

    #[test]
    fn test_arity_and_kind_checks() {
        let def = MetricDefinition {
            name: "requests_total".to_string(),
            kind: MetricKind::Counter,
            description: None,
            label_names: names(&["host", "status"]),
            buckets: Vec::new(),
        };
        assert!(def.check_arity(2).is_ok());
        assert!(matches!(
            def.check_arity(1),
            Err(MetricError::LabelArity { expected: 2, actual: 1, .. })
        ));
        assert!(def.check_kind(MetricKind::Counter).is_ok());
        assert!(matches!(
            def.check_kind(MetricKind::Gauge),
            Err(MetricError::TypeMismatch { expected: "gauge", actual: "counter", .. })
        ));
    }
}
