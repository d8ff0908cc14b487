#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tally/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod report;
pub mod sink;
pub mod summary;

pub use export::{ExportError, ExportFormat, Exporter};
pub use report::{
    MoatScoresSortBy, ScoresFilter, ScoresSortBy, SortDirection, moat_scorecard_table,
    moat_scores_table, scores_table, select_moat_scores, select_scores, value_scorecard_table,
};
pub use sink::SummaryWriter;
pub use summary::{CompanyMoatScoreSummary, CompanyScoreSummary};

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
