//! Environment-driven settings.
//!
//! Every setting has a default. Absent variables fall back to it silently;
//! malformed ones fall back with a warning naming the variable.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::log_warn;

// =============================================================================
// CONFIGURATION CONSTANTS & HELPERS
// =============================================================================

const PREFIX_ENV: &str = "METRICS_PREFIX";
const ERROR_METRIC_ENV: &str = "METRICS_ERROR_METRIC_NAME";
const MAX_SERIES_ENV: &str = "METRICS_MAX_SERIES";
const MAX_LOGGED_ERRORS_ENV: &str = "METRICS_MAX_LOGGED_ERRORS";
const PUSH_INTERVAL_ENV: &str = "PUSH_INTERVAL_SECS";
const PUSH_JOB_ENV: &str = "PUSH_JOB";

/// Name of the built-in self-monitoring counter, before the prefix is applied
pub const DEFAULT_ERROR_METRIC_NAME: &str = "metric_errors_total";

/// Default upper bound on distinct label combinations per metric
pub const DEFAULT_MAX_SERIES_PER_METRIC: usize = 10_000;

/// Default number of update errors logged before logging goes quiet
pub const DEFAULT_MAX_LOGGED_ERRORS: usize = 100;

const DEFAULT_PUSH_INTERVAL_SECS: u64 = 15;
const DEFAULT_PUSH_JOB: &str = "push-registry";

fn warn_fallback(name: &str, raw: &str, reason: &str) {
    log_warn!(
        "Configuration",
        &format!("Ignoring {}={:?} ({}), using default", name, raw, reason),
        "invalid_env_value"
    );
}

/// Reads and parses an environment variable, `None` when unset or malformed.
fn parse_env_var<T>(name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn_fallback(name, &raw, &e.to_string());
            None
        }
    }
}

/// Helper to read an environment variable with a default value.
fn get_env_var<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_env_var(name).unwrap_or(default)
}

fn is_identifier_fragment(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

// =============================================================================
// REGISTRY CONFIGURATION
// =============================================================================

/// Settings that shape a [`Registry`](crate::metrics::Registry).
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Prepended to every registered metric name
    pub prefix: String,
    /// Name of the built-in error counter (prefix is applied on top)
    pub error_metric_name: String,
    /// Maximum distinct series per metric; `0` disables the limit
    pub max_series_per_metric: usize,
    /// Update errors beyond this count are counted but no longer logged
    pub max_logged_errors: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            error_metric_name: DEFAULT_ERROR_METRIC_NAME.to_string(),
            max_series_per_metric: DEFAULT_MAX_SERIES_PER_METRIC,
            max_logged_errors: DEFAULT_MAX_LOGGED_ERRORS,
        }
    }
}

impl RegistryConfig {
    /// Loads the registry configuration from the environment.
    ///
    /// # Configuration (from environment variables with defaults)
    /// - `METRICS_PREFIX`: name prefix (default: empty).
    /// - `METRICS_ERROR_METRIC_NAME`: error counter name (default: `metric_errors_total`).
    /// - `METRICS_MAX_SERIES`: series limit per metric (default: 10000, 0 = unlimited).
    /// - `METRICS_MAX_LOGGED_ERRORS`: logged update errors (default: 100).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let mut prefix = get_env_var(PREFIX_ENV, defaults.prefix.clone());
        if !is_identifier_fragment(&prefix) {
            warn_fallback(
                PREFIX_ENV,
                &prefix,
                "must contain only letters, digits and underscores and not start with a digit",
            );
            prefix = defaults.prefix;
        }

        Self {
            prefix,
            error_metric_name: get_env_var(ERROR_METRIC_ENV, defaults.error_metric_name),
            max_series_per_metric: get_env_var(MAX_SERIES_ENV, defaults.max_series_per_metric),
            max_logged_errors: get_env_var(MAX_LOGGED_ERRORS_ENV, defaults.max_logged_errors),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_max_series_per_metric(mut self, limit: usize) -> Self {
        self.max_series_per_metric = limit;
        self
    }

    pub fn with_max_logged_errors(mut self, limit: usize) -> Self {
        self.max_logged_errors = limit;
        self
    }
}

// =============================================================================
// PUSH LOOP CONFIGURATION
// =============================================================================

/// Timer settings for the demo push loop in the binary.
#[derive(Debug, Clone, PartialEq)]
pub struct PushSettings {
    /// Time between push cycles
    pub interval: Duration,
    /// Job name reported alongside each payload
    pub job: String,
}

impl PushSettings {
    /// Loads push settings from `PUSH_INTERVAL_SECS` (default 15) and `PUSH_JOB`.
    ///
    /// An interval of 0 falls back to the default.
    pub fn from_env() -> Self {
        let mut secs = get_env_var(PUSH_INTERVAL_ENV, DEFAULT_PUSH_INTERVAL_SECS);
        if secs == 0 {
            warn_fallback(PUSH_INTERVAL_ENV, "0", "interval must be at least one second");
            secs = DEFAULT_PUSH_INTERVAL_SECS;
        }

        Self {
            interval: Duration::from_secs(secs),
            job: get_env_var(PUSH_JOB_ENV, DEFAULT_PUSH_JOB.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process-wide environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for name in [
            PREFIX_ENV,
            ERROR_METRIC_ENV,
            MAX_SERIES_ENV,
            MAX_LOGGED_ERRORS_ENV,
            PUSH_INTERVAL_ENV,
            PUSH_JOB_ENV,
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults_without_env() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let config = RegistryConfig::from_env();
        assert_eq!(config, RegistryConfig::default());
        assert_eq!(config.error_metric_name, "metric_errors_total");

        let push = PushSettings::from_env();
        assert_eq!(push.interval, Duration::from_secs(15));
        assert_eq!(push.job, "push-registry");
    }

    #[test]
    fn test_values_from_env() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var(PREFIX_ENV, "app_");
        env::set_var(MAX_SERIES_ENV, "50");
        env::set_var(PUSH_INTERVAL_ENV, "5");

        let config = RegistryConfig::from_env();
        assert_eq!(config.prefix, "app_");
        assert_eq!(config.max_series_per_metric, 50);
        assert_eq!(
            PushSettings::from_env().interval,
            Duration::from_secs(5)
        );
        clear_env();
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var(MAX_LOGGED_ERRORS_ENV, "lots");
        env::set_var(MAX_SERIES_ENV, "-3");
        env::set_var(PREFIX_ENV, "9bad-prefix");
        env::set_var(ERROR_METRIC_ENV, "errors_total");

        let config = RegistryConfig::from_env();
        assert_eq!(config.max_logged_errors, DEFAULT_MAX_LOGGED_ERRORS);
        assert_eq!(config.max_series_per_metric, DEFAULT_MAX_SERIES_PER_METRIC);
        assert_eq!(config.prefix, "");
        assert_eq!(config.error_metric_name, "errors_total");

        env::set_var(PUSH_INTERVAL_ENV, "0");
        assert_eq!(PushSettings::from_env().interval, Duration::from_secs(15));
        env::set_var(PUSH_INTERVAL_ENV, "soon");
        assert_eq!(PushSettings::from_env().interval, Duration::from_secs(15));
        clear_env();
    }

    #[test]
    fn test_builder_methods() {
        let config = RegistryConfig::default()
            .with_prefix("svc_")
            .with_max_series_per_metric(3)
            .with_max_logged_errors(0);
        assert_eq!(config.prefix, "svc_");
        assert_eq!(config.max_series_per_metric, 3);
        assert_eq!(config.max_logged_errors, 0);
    }
}
