#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tally/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod company;
pub mod error;
pub mod fact;
pub mod source;
pub mod store;
pub mod window;

pub use company::{Company, LatestPrice};
pub use error::{DataError, Result};
pub use fact::{BalancePolarity, CompanyFacts, Fact, FilingFrequency};
pub use source::{CompanyDirectory, FactSource, PriceSource};
pub use store::FactStore;
pub use window::bound_to_window;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
