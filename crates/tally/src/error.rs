//! Scoring run errors.

use std::time::Duration;
use tally_data::DataError;
use thiserror::Error;

/// Result type for scoring runs
pub type Result<T> = std::result::Result<T, ScoreError>;

/// A systemic failure that aborts a whole run or company.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Upstream collaborator failed
    #[error("Fetch failed: {0}")]
    Fetch(#[from] DataError),

    /// Upstream collaborator did not answer in time
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled
    #[error("Scoring run cancelled")]
    Cancelled,

    /// No such company in the directory
    #[error("Company not found: {0}")]
    CompanyNotFound(u64),

    /// The scoring worker panicked or was aborted
    #[error("Worker failed: {0}")]
    Worker(String),
}
