//! Error types for probemon.
//!
//! All errors use `thiserror` for ergonomic error handling and proper error chains.
//! Only validation and migration failures are fatal; every steady-state error
//! (probe, parse, storage) is logged by its owner and the unit of work dropped.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for probemon operations.
pub type Result<T> = std::result::Result<T, ProbemonError>;

/// Main error type for probemon.
#[derive(Error, Debug)]
pub enum ProbemonError {
    // Registry errors
    #[error("Invalid metric names (must match [-_A-Za-z0-9]{{1,512}}): {}", names.join(", "))]
    InvalidMetricNames { names: Vec<String> },

    #[error("Invalid graph options for metric {metric}: {reason}")]
    InvalidGraphOption { metric: String, reason: String },

    // Schema errors
    #[error("Database migration failed for metric {metric}: {reason}")]
    MigrationFailed { metric: String, reason: String },

    // Probe errors
    #[error("Probe for {metric} failed: {reason}")]
    ProbeFailed { metric: String, reason: String },

    #[error("Probe for {metric} timed out after {timeout:?}")]
    ProbeTimeout { metric: String, timeout: Duration },

    #[error("Probe for {metric} returned non-numeric output {output:?}")]
    ProbeOutputNotNumeric { metric: String, output: String },

    // Storage errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    // Query errors
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidTimeRange { start: i64, end: i64 },

    #[error("Unknown metric: {name}")]
    UnknownMetric { name: String },

    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String },

    // Configuration errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("I/O error at {path:?}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProbemonError {
    /// Create an Internal error from any error type.
    pub fn internal(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Internal(err.to_string())
    }

    /// Whether the error belongs to the read path's query family.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimeRange { .. } | Self::UnknownMetric { .. } | Self::InvalidQuery { .. }
        )
    }
}
