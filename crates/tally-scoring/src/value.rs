//! Value scorecard metrics.

use crate::config::ScoringConfig;
use crate::flows::{Average, YearFlows, ratio};
use crate::partition::PartitionedFacts;
use crate::resolver::{resolve, resolve_equity};
use serde::{Deserialize, Serialize};

/// Metrics feeding the value scorecard. `None` means the metric could not be
/// computed from the available facts, not that it is zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Equity less goodwill and intangibles
    pub book_value: Option<f64>,
    /// Price times shares outstanding
    pub market_cap: Option<f64>,
    /// Long-term debt over equity
    pub debt_to_equity: Option<f64>,
    /// Market cap over book value
    pub price_to_book: Option<f64>,
    /// Long-term debt over book value
    pub debt_to_book: Option<f64>,
    /// Retained earnings with distributions added back
    pub adjusted_retained_earnings: Option<f64>,
    /// Retained earnings of the earliest annual year
    pub oldest_retained_earnings: Option<f64>,
    /// Mean net cash flow over years reporting a cash change
    pub average_net_cash_flow: Option<f64>,
    /// Mean owner earnings over years reporting net income
    pub average_owner_earnings: Option<f64>,
    /// Estimated return on market cap, cash-flow basis (%)
    pub estimated_return_cf: Option<f64>,
    /// Estimated return on market cap, owner-earnings basis (%)
    pub estimated_return_oe: Option<f64>,
    /// Dividends paid in the most recent annual year
    pub current_dividends: Option<f64>,
}

/// Compute the value metrics.
///
/// Point-in-time figures (equity, debt, goodwill, intangibles, retained
/// earnings) come from the latest snapshot; averages and cumulative totals
/// come from annual years only.
pub fn compute_value_metrics(
    partitioned: &PartitionedFacts,
    price: Option<f64>,
    shares: Option<i64>,
    config: &ScoringConfig,
) -> DerivedMetrics {
    let chains = &config.chains;
    let latest = &partitioned.latest;

    let equity = resolve_equity(latest, chains);
    let goodwill = resolve(latest, &chains.goodwill, Some(0.0)).unwrap_or(0.0);
    let intangibles = resolve(latest, &chains.intangibles, Some(0.0)).unwrap_or(0.0);
    let debt = resolve(latest, &chains.debt, Some(0.0)).unwrap_or(0.0);
    let retained_earnings = resolve(latest, &chains.retained_earnings, None);

    let book_value = equity.map(|e| e - (goodwill + intangibles));
    let market_cap = price.zip(shares).map(|(p, s)| p * s as f64);
    let debt_to_equity = equity.and_then(|e| ratio(debt, e));
    let price_to_book = market_cap
        .zip(book_value)
        .and_then(|(mc, bv)| ratio(mc, bv));
    let debt_to_book = book_value.and_then(|bv| ratio(debt, bv));

    let mut net_cash_flow = Average::default();
    let mut owner_earnings = Average::default();
    let mut total_dividends = 0.0;
    let mut total_stock_issuance = 0.0;
    let mut total_preferred_issuance = 0.0;

    for snapshot in partitioned.annual.values() {
        let flows = YearFlows::resolve(snapshot, config);
        net_cash_flow.push_opt(flows.net_cash_flow);
        owner_earnings.push_opt(flows.owner_earnings);
        total_dividends += flows.dividends;
        total_stock_issuance += flows.net_stock_issuance;
        total_preferred_issuance += flows.net_preferred_issuance;
    }

    let adjusted_retained_earnings = retained_earnings
        .map(|re| re + total_dividends - total_stock_issuance - total_preferred_issuance);

    let current_dividends = partitioned
        .most_recent_year()
        .and_then(|(_, snapshot)| resolve(snapshot, &chains.dividends, Some(0.0)));

    let average_net_cash_flow = net_cash_flow.mean();
    let average_owner_earnings = owner_earnings.mean();

    // Without a book value the return estimates are not reported either.
    let estimated_return = |average: Option<f64>| {
        book_value?;
        let (average, dividends, cap) = (average?, current_dividends?, market_cap?);
        ratio(100.0 * (average - dividends), cap)
    };

    DerivedMetrics {
        book_value,
        market_cap,
        debt_to_equity,
        price_to_book,
        debt_to_book,
        adjusted_retained_earnings,
        oldest_retained_earnings: partitioned.oldest_retained_earnings,
        average_net_cash_flow,
        average_owner_earnings,
        estimated_return_cf: estimated_return(average_net_cash_flow),
        estimated_return_oe: estimated_return(average_owner_earnings),
        current_dividends,
    }
}

/// Highest price per share the value rules would pay:
/// `min(3 × book, 20 × (avg NCF − dividends), 20 × (avg OE − dividends)) / shares`.
pub fn max_buy_price(metrics: &DerivedMetrics, shares: Option<i64>) -> Option<f64> {
    let shares = shares.filter(|s| *s > 0)?;
    let dividends = metrics.current_dividends?;

    let by_book = 3.0 * metrics.book_value?;
    let by_cash_flow = 20.0 * (metrics.average_net_cash_flow? - dividends);
    let by_owner_earnings = 20.0 * (metrics.average_owner_earnings? - dividends);

    Some(by_book.min(by_cash_flow).min(by_owner_earnings) / shares as f64)
}

/// Percentage by which `max_buy` exceeds `price`.
pub fn percentage_upside(max_buy: Option<f64>, price: Option<f64>) -> Option<f64> {
    let (max_buy, price) = (max_buy?, price?);
    ratio(max_buy - price, price).map(|r| r * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use tally_data::Fact;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn year_facts(year: i32, pairs: &[(&str, f64)]) -> Vec<Fact> {
        pairs
            .iter()
            .map(|(c, v)| Fact::annual(*c, *v, date(year, 12, 31)))
            .collect()
    }

    #[test]
    fn test_balance_sheet_ratios() {
        let config = ScoringConfig::default();
        let facts = year_facts(
            2023,
            &[
                ("StockholdersEquity", 1000.0),
                ("Goodwill", 100.0),
                ("IntangibleAssetsNetExcludingGoodwill", 100.0),
                ("LongTermDebt", 200.0),
            ],
        );
        let p = partition(&facts, &config);
        let m = compute_value_metrics(&p, Some(10.0), Some(100), &config);

        assert_eq!(m.book_value, Some(800.0));
        assert_eq!(m.market_cap, Some(1000.0));
        assert_relative_eq!(m.debt_to_equity.unwrap(), 0.2);
        assert_relative_eq!(m.price_to_book.unwrap(), 1.25);
        assert_relative_eq!(m.debt_to_book.unwrap(), 0.25);
    }

    #[test]
    fn test_missing_equity_cascades() {
        let config = ScoringConfig::default();
        let facts = year_facts(
            2023,
            &[
                ("LongTermDebt", 200.0),
                ("NetIncomeLoss", 50.0),
                ("CashAndCashEquivalentsPeriodIncreaseDecrease", 40.0),
            ],
        );
        let p = partition(&facts, &config);
        let m = compute_value_metrics(&p, Some(10.0), Some(100), &config);

        assert_eq!(m.book_value, None);
        assert_eq!(m.debt_to_equity, None);
        assert_eq!(m.price_to_book, None);
        assert_eq!(m.debt_to_book, None);
        assert_eq!(m.estimated_return_cf, None);
        assert_eq!(m.estimated_return_oe, None);
        assert_eq!(m.market_cap, Some(1000.0));
        assert_eq!(m.average_owner_earnings, Some(50.0));
    }

    #[test]
    fn test_averages_and_estimated_returns() {
        let config = ScoringConfig::default();
        let mut facts = year_facts(
            2022,
            &[
                ("NetIncomeLoss", 100.0),
                ("CashAndCashEquivalentsPeriodIncreaseDecrease", 60.0),
                ("PaymentsOfDividends", 10.0),
            ],
        );
        facts.extend(year_facts(
            2023,
            &[
                ("NetIncomeLoss", 200.0),
                ("PaymentsOfDividends", 20.0),
                ("StockholdersEquity", 5000.0),
                ("RetainedEarningsAccumulatedDeficit", 900.0),
                ("PaymentsForRepurchaseOfCommonStock", 50.0),
            ],
        ));
        let p = partition(&facts, &config);
        let m = compute_value_metrics(&p, Some(10.0), Some(100), &config);

        assert_eq!(m.average_owner_earnings, Some(150.0));
        assert_eq!(m.average_net_cash_flow, Some(60.0));
        assert_eq!(m.current_dividends, Some(20.0));
        // 900 + (10 + 20) - (0 - 50)
        assert_eq!(m.adjusted_retained_earnings, Some(980.0));
        assert_relative_eq!(m.estimated_return_oe.unwrap(), 13.0);
        assert_relative_eq!(m.estimated_return_cf.unwrap(), 4.0);
    }

    #[test]
    fn test_zero_shares_or_price_is_unavailable_not_fault() {
        let config = ScoringConfig::default();
        let facts = year_facts(
            2023,
            &[("StockholdersEquity", 100.0), ("NetIncomeLoss", 10.0)],
        );
        let p = partition(&facts, &config);

        let m = compute_value_metrics(&p, Some(10.0), Some(0), &config);
        assert_eq!(m.market_cap, Some(0.0));
        assert_eq!(m.price_to_book, Some(0.0));
        assert_eq!(m.estimated_return_oe, None);

        let m = compute_value_metrics(&p, None, Some(10), &config);
        assert_eq!(m.market_cap, None);
        assert_eq!(percentage_upside(Some(5.0), Some(0.0)), None);
    }

    #[test]
    fn test_max_buy_price_takes_minimum() {
        let metrics = DerivedMetrics {
            book_value: Some(1000.0),
            average_net_cash_flow: Some(120.0),
            average_owner_earnings: Some(200.0),
            current_dividends: Some(20.0),
            ..Default::default()
        };
        // min(3000, 2000, 3600) / 100
        assert_eq!(max_buy_price(&metrics, Some(100)), Some(20.0));
        assert_eq!(max_buy_price(&metrics, Some(0)), None);
        assert_eq!(max_buy_price(&metrics, None), None);
        assert_relative_eq!(percentage_upside(Some(20.0), Some(16.0)).unwrap(), 25.0);
    }
}
