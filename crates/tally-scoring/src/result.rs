//! Scorecard results.
//!
//! A result bundles everything computed for one company and one family: the
//! annual series it was computed from, the derived metrics, the ordered
//! checks and the price context.

use crate::checks::{ScoringCheck, Scorecard, evaluate_moat_checks, evaluate_value_checks};
use crate::config::ScoringConfig;
use crate::moat::{MoatDerivedMetrics, MoatYearMetrics, compute_moat_metrics};
use crate::partition::PartitionedFacts;
use crate::resolver::{Snapshot, resolve};
use crate::value::{DerivedMetrics, compute_value_metrics, max_buy_price, percentage_upside};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_data::LatestPrice;

/// Price and share count a scorecard was computed against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceContext {
    /// Latest close on or before the run date
    pub price_per_share: Option<f64>,
    /// Date of that close
    pub price_date: Option<NaiveDate>,
    /// Shares outstanding from the latest snapshot
    pub shares_outstanding: Option<i64>,
}

impl PriceContext {
    /// Combine a looked-up price with the shares reported on the latest
    /// snapshot. Fractional share counts are truncated.
    pub fn resolve(
        partitioned: &PartitionedFacts,
        price: Option<&LatestPrice>,
        config: &ScoringConfig,
    ) -> Self {
        let shares_outstanding =
            resolve(&partitioned.latest, &config.chains.shares, None).map(|s| s.trunc() as i64);

        Self {
            price_per_share: price.map(|p| p.close),
            price_date: price.map(|p| p.price_date),
            shares_outstanding,
        }
    }
}

/// Value scorecard for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Annual values the averages were computed from
    pub annual: BTreeMap<i32, Snapshot>,
    /// Derived metrics
    pub metrics: DerivedMetrics,
    /// The 13 value checks in order
    pub checks: Vec<ScoringCheck>,
    /// Passing checks
    pub overall_score: usize,
    /// Checks that passed or failed
    pub computable_checks: usize,
    /// Annual years available
    pub years_of_data: usize,
    /// Price context
    pub price: PriceContext,
    /// Highest price per share the value rules would pay
    pub max_buy_price: Option<f64>,
    /// Upside of `max_buy_price` over the current price (%)
    pub percentage_upside: Option<f64>,
}

impl ScoringResult {
    /// Score a partitioned company on the value family.
    pub fn compute(
        partitioned: &PartitionedFacts,
        price: Option<&LatestPrice>,
        config: &ScoringConfig,
    ) -> Self {
        let context = PriceContext::resolve(partitioned, price, config);
        let years_of_data = partitioned.years_of_data();

        let metrics = compute_value_metrics(
            partitioned,
            context.price_per_share,
            context.shares_outstanding,
            config,
        );
        let card = Scorecard::tally(evaluate_value_checks(&metrics, years_of_data));

        let max_buy = max_buy_price(&metrics, context.shares_outstanding);
        let upside = percentage_upside(max_buy, context.price_per_share);

        Self {
            annual: partitioned.annual.clone(),
            metrics,
            checks: card.checks,
            overall_score: card.overall_score,
            computable_checks: card.computable_checks,
            years_of_data,
            price: context,
            max_buy_price: max_buy,
            percentage_upside: upside,
        }
    }
}

/// Moat scorecard for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoatScoringResult {
    /// Annual values the averages were computed from
    pub annual: BTreeMap<i32, Snapshot>,
    /// Derived metrics
    pub metrics: MoatDerivedMetrics,
    /// The 13 moat checks in order
    pub checks: Vec<ScoringCheck>,
    /// Per-year margins, returns and revenue, oldest first
    pub trend: Vec<MoatYearMetrics>,
    /// Passing checks
    pub overall_score: usize,
    /// Checks that passed or failed
    pub computable_checks: usize,
    /// Annual years available
    pub years_of_data: usize,
    /// Price context
    pub price: PriceContext,
}

impl MoatScoringResult {
    /// Score a partitioned company on the moat family.
    pub fn compute(
        partitioned: &PartitionedFacts,
        price: Option<&LatestPrice>,
        config: &ScoringConfig,
    ) -> Self {
        let context = PriceContext::resolve(partitioned, price, config);
        let years_of_data = partitioned.years_of_data();

        let (metrics, trend) = compute_moat_metrics(
            partitioned,
            context.price_per_share,
            context.shares_outstanding,
            config,
        );
        let card = Scorecard::tally(evaluate_moat_checks(&metrics, years_of_data));

        Self {
            annual: partitioned.annual.clone(),
            metrics,
            checks: card.checks,
            trend,
            overall_score: card.overall_score,
            computable_checks: card.computable_checks,
            years_of_data,
            price: context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use tally_data::Fact;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_price_context_truncates_shares() {
        let config = ScoringConfig::default();
        let facts = vec![
            Fact::annual("EntityCommonStockSharesOutstanding", 1_000.9, date(2023, 12, 31)),
            Fact::annual("StockholdersEquity", 500.0, date(2023, 12, 31)),
        ];
        let p = partition(&facts, &config);
        let price = LatestPrice::new("ACME", 12.5, date(2024, 3, 1));

        let result = ScoringResult::compute(&p, Some(&price), &config);
        assert_eq!(result.price.shares_outstanding, Some(1_000));
        assert_eq!(result.price.price_per_share, Some(12.5));
        assert_eq!(result.price.price_date, Some(date(2024, 3, 1)));
        assert_eq!(result.metrics.market_cap, Some(12_500.0));
    }

    #[test]
    fn test_without_price_result_is_still_complete() {
        let config = ScoringConfig::default();
        let facts = vec![Fact::annual("StockholdersEquity", 500.0, date(2023, 12, 31))];
        let p = partition(&facts, &config);

        let value = ScoringResult::compute(&p, None, &config);
        assert_eq!(value.checks.len(), 13);
        assert_eq!(value.years_of_data, 1);
        assert_eq!(value.max_buy_price, None);
        assert_eq!(value.percentage_upside, None);

        let moat = MoatScoringResult::compute(&p, None, &config);
        assert_eq!(moat.checks.len(), 13);
        assert_eq!(moat.trend.len(), 1);
        assert_eq!(moat.price, PriceContext::default());
    }
}
