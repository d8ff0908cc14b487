//! Error types for scoring configuration.

use thiserror::Error;

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating a [`crate::ScoringConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for the expected shape
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A concept chain has no entries
    #[error("Concept chain '{0}' is empty")]
    EmptyChain(String),

    /// A year window of zero
    #[error("Window '{0}' must cover at least one annual year")]
    EmptyWindow(&'static str),

    /// Working-capital group polarity other than Credit or Debit
    #[error("Working-capital group '{0}' must be Credit or Debit")]
    InvalidPolarity(String),

    /// Two working-capital groups share a name
    #[error("Duplicate working-capital group '{0}'")]
    DuplicateGroup(String),

    /// A group names a superseding group that is not declared before it
    #[error("Working-capital group '{group}' is superseded by '{superseded_by}', which is not declared earlier")]
    UnknownSupersedingGroup {
        /// Group carrying the reference
        group: String,
        /// The unresolved reference
        superseded_by: String,
    },

    /// A concept listed in more than one working-capital group
    #[error("Concept '{concept}' appears in both '{first}' and '{second}'")]
    DuplicateConcept {
        /// The repeated concept
        concept: String,
        /// First group listing it
        first: String,
        /// Second group listing it
        second: String,
    },
}
