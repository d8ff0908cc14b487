#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tally/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod checks;
pub mod config;
pub mod error;
pub mod flows;
pub mod moat;
pub mod partition;
pub mod registry;
pub mod resolver;
pub mod result;
pub mod value;

pub use checks::{
    CheckResult, Scorecard, ScoringCheck, evaluate_moat_checks, evaluate_value_checks,
};
pub use config::{ConceptChain, ConceptChains, ScoringConfig, WorkingCapitalGroup, WorkingCapitalTable};
pub use error::{ConfigError, Result};
pub use moat::{MoatDerivedMetrics, MoatYearMetrics, compute_moat_metrics};
pub use partition::{PartitionedFacts, partition};
pub use registry::{CheckFamily, CheckInfo, available_checks, get_check_info};
pub use resolver::{Snapshot, resolve};
pub use result::{MoatScoringResult, PriceContext, ScoringResult};
pub use value::{DerivedMetrics, compute_value_metrics, max_buy_price, percentage_upside};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
