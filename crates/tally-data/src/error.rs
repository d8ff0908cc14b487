//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while reading or writing facts, prices and companies.
#[derive(Debug, Error)]
pub enum DataError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// A fact value that cannot enter the engine (NaN or infinite)
    #[error("Invalid value for {concept}: {value}")]
    InvalidValue {
        /// Concept the value was reported under
        concept: String,
        /// The rejected value
        value: f64,
    },

    /// Another thread panicked while holding the store connection
    #[error("Store connection lock poisoned")]
    LockPoisoned,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream collaborator failure not covered by the other variants
    #[error("Upstream source error: {0}")]
    Upstream(String),
}
