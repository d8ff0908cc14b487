#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tally/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod error;
pub mod scorer;

// Re-export main types from sub-crates
pub use tally_data as data;
pub use tally_output as output;
pub use tally_scoring as scoring;

pub use cancel::CancelFlag;
pub use error::{Result, ScoreError};
pub use scorer::Scorer;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
