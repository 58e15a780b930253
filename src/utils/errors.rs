//! Error taxonomy for registry operations.
//!
//! Registration errors are returned to the caller. Update errors are returned
//! only by the `try_*` handle methods; the plain update methods swallow them and
//! bump the registry's built-in error counter instead.

use thiserror::Error;

/// Errors raised by the metric registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// Metric name does not match `[a-zA-Z_][a-zA-Z0-9_]*`
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),

    /// Label name is malformed, reserved, or declared twice
    #[error("invalid label name {label:?} for metric {metric}: {reason}")]
    InvalidLabelName {
        metric: String,
        label: String,
        reason: &'static str,
    },

    /// Name already registered with a different definition
    #[error("metric {0} is already registered with a different definition")]
    DuplicateMetric(String),

    /// Label vector length differs from the declared label names
    #[error("metric {metric} expects {expected} label values, got {actual}")]
    LabelArity {
        metric: String,
        expected: usize,
        actual: usize,
    },

    /// A labeled metric was asked to delete without label values
    #[error("metric {0} has labels; label values are required to delete a series")]
    MissingLabels(String),

    /// Update or delete referenced a name that is not registered
    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    /// Operation does not apply to the registered metric type
    #[error("metric {metric} is a {actual}, not a {expected}")]
    TypeMismatch {
        metric: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Negative counter increment or non-finite observation
    #[error("invalid value {value} for metric {metric}: {reason}")]
    InvalidValue {
        metric: String,
        value: f64,
        reason: &'static str,
    },

    /// Histogram bucket boundaries are empty, non-finite, or unordered
    #[error("invalid buckets for metric {metric}: {reason}")]
    InvalidBuckets { metric: String, reason: String },

    /// Creating a new series would exceed the per-metric series limit
    #[error("metric {metric} reached its series limit of {limit}")]
    CardinalityLimit { metric: String, limit: usize },

    /// The built-in error counter cannot be removed
    #[error("built-in metric {0} cannot be unregistered")]
    BuiltinMetric(String),

    /// A stored label key could not be decoded
    #[error("corrupt label key for metric {metric}: {reason}")]
    CorruptLabelKey { metric: String, reason: &'static str },
}

impl MetricError {
    /// Short machine-readable tag, used as the `outcome` of log events.
    pub fn kind(&self) -> &'static str {
        match self {
            MetricError::InvalidName(_) => "invalid_name",
            MetricError::InvalidLabelName { .. } => "invalid_label_name",
            MetricError::DuplicateMetric(_) => "duplicate_metric",
            MetricError::LabelArity { .. } => "label_arity",
            MetricError::MissingLabels(_) => "missing_labels",
            MetricError::UnknownMetric(_) => "unknown_metric",
            MetricError::TypeMismatch { .. } => "type_mismatch",
            MetricError::InvalidValue { .. } => "invalid_value",
            MetricError::InvalidBuckets { .. } => "invalid_buckets",
            MetricError::CardinalityLimit { .. } => "cardinality_limit",
            MetricError::BuiltinMetric(_) => "builtin_metric",
            MetricError::CorruptLabelKey { .. } => "corrupt_label_key",
        }
    }
}

/// Result alias for registry operations
pub type Result<T> = std::result::Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MetricError::LabelArity {
            metric: "requests_total".to_string(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "metric requests_total expects 2 label values, got 1"
        );
        assert_eq!(err.kind(), "label_arity");

        let err = MetricError::UnknownMetric("missing".to_string());
        assert_eq!(err.to_string(), "unknown metric: missing");
        assert_eq!(err.kind(), "unknown_metric");
    }
}
