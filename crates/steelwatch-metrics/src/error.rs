//! Error types for metrics computation.

use thiserror::Error;

/// Result type for metrics computation.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Errors raised while computing metrics from a price history.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Price history lacks a required column
    #[error("Price history is missing required column '{0}'")]
    MissingColumn(&'static str),
}
