//! Structured logging for the metrics registry.
//!
//! Every event carries the same set of fields (`service`, `process`, `message`,
//! `outcome`, `origin`) so log pipelines can filter registry events without
//! parsing free text. The `origin` field names the source file that emitted it.

use tracing::Level;

/// Service name attached to every event
const SERVICE_NAME: &str = "push-registry";

/// Main logging interface
pub struct Log;

impl Log {
    /// Emits a structured event through `tracing`.
    ///
    /// `level_str` is one of `DEBUG`, `INFO`, `WARN`, `ERROR`; anything else is
    /// logged at INFO.
    pub fn event(level_str: &str, process: &str, message: &str, outcome: &str, origin: &str) {
        match level_str {
            "DEBUG" => tracing::event!(
                Level::DEBUG,
                service = SERVICE_NAME,
                process = process,
                message = message,
                outcome = outcome,
                origin = origin
            ),
            "WARN" => tracing::event!(
                Level::WARN,
                service = SERVICE_NAME,
                process = process,
                message = message,
                outcome = outcome,
                origin = origin
            ),
            "ERROR" => tracing::event!(
                Level::ERROR,
                service = SERVICE_NAME,
                process = process,
                message = message,
                outcome = outcome,
                origin = origin
            ),
            _ => tracing::event!(
                Level::INFO,
                service = SERVICE_NAME,
                process = process,
                message = message,
                outcome = outcome,
                origin = origin
            ),
        };
    }
}

#[macro_export]
macro_rules! log_debug {
    ($process:expr, $event:expr, $result:expr) => {
        $crate::utils::log::Log::event("DEBUG", $process, $event, $result, file!())
    };
}

#[macro_export]
macro_rules! log_info {
    ($process:expr, $event:expr, $result:expr) => {
        $crate::utils::log::Log::event("INFO", $process, $event, $result, file!())
    };
}

#[macro_export]
macro_rules! log_warn {
    ($process:expr, $event:expr, $result:expr) => {
        $crate::utils::log::Log::event("WARN", $process, $event, $result, file!())
    };
}

#[macro_export]
macro_rules! log_error {
    ($process:expr, $event:expr, $result:expr) => {
        $crate::utils::log::Log::event("ERROR", $process, $event, $result, file!())
    };
}
