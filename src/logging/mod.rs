//! Logging and observability
//!
//! Structured logging through `tracing`, with:
//! - Console output
//! - JSON file output with rotation
//! - `RUST_LOG` overrides
//!
//! # Example
//!
//! ```no_run
//! use quarry::logging::init_logging;
//! use quarry::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table = "staff", rows = 12, "Extracted table");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use quarry::log_stage_start;
///
/// log_stage_start!("extract", 11);
/// ```
#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $tables:expr) => {
        tracing::info!(stage = $stage, tables = $tables, "Starting stage");
    };
}

/// Log the completion of a pipeline stage
///
/// # Example
///
/// ```no_run
/// use quarry::log_stage_complete;
/// use std::time::Duration;
///
/// log_stage_complete!("load", 120, 0, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_stage_complete {
    ($stage:expr, $rows:expr, $failed:expr, $duration:expr) => {
        tracing::info!(
            stage = $stage,
            rows = $rows,
            failed_tables = $failed,
            duration_ms = $duration.as_millis() as u64,
            "Stage completed"
        );
    };
}

/// Log a recovered per-table failure
///
/// # Example
///
/// ```no_run
/// use quarry::log_table_failure;
/// use quarry::domain::QuarryError;
///
/// let error = QuarryError::extraction("staff", "connection reset");
/// log_table_failure!("extract", "staff", &error);
/// ```
#[macro_export]
macro_rules! log_table_failure {
    ($stage:expr, $table:expr, $error:expr) => {
        tracing::error!(
            stage = $stage,
            table = %$table,
            error = %$error,
            "Table failed"
        );
    };
}
