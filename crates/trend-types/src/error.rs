//! Error types for the trend-radar system.

use thiserror::Error;

/// Unified error type for engine operations.
///
/// Per-source grouping failures never surface here; they are recorded on
/// the [`Report`](crate::Report) instead. Input files are read by the CLI,
/// which reports its own errors.
#[derive(Debug, Error)]
pub enum TrendError {
    /// Configuration error (fatal, raised before any work starts)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
