//! Moat (quality) scorecard metrics.

use crate::config::ScoringConfig;
use crate::flows::{Average, YearFlows, ratio};
use crate::partition::PartitionedFacts;
use crate::resolver::{resolve, resolve_equity};
use serde::{Deserialize, Serialize};

/// Metrics feeding the moat scorecard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MoatDerivedMetrics {
    /// Mean gross margin (%)
    pub average_gross_margin: Option<f64>,
    /// Mean operating margin (%)
    pub average_operating_margin: Option<f64>,
    /// Mean net cash flow over that year's equity (%)
    pub average_roe_cf: Option<f64>,
    /// Mean owner earnings over that year's equity (%)
    pub average_roe_oe: Option<f64>,
    /// Compound annual revenue growth (%)
    pub revenue_cagr: Option<f64>,
    /// Mean capex over mean owner earnings (%)
    pub capex_ratio: Option<f64>,
    /// Operating income over interest expense, most recent year
    pub interest_coverage: Option<f64>,
    /// Long-term debt over equity, latest snapshot
    pub debt_to_equity: Option<f64>,
    /// Estimated return on market cap, owner-earnings basis (%)
    pub estimated_return_oe: Option<f64>,
    /// Dividends paid in the most recent annual year
    pub current_dividends: Option<f64>,
    /// Price times shares outstanding
    pub market_cap: Option<f64>,
    /// Price per share
    pub price_per_share: Option<f64>,
    /// Years with owner earnings above zero
    pub positive_oe_years: usize,
    /// Years with owner earnings computed
    pub total_oe_years: usize,
    /// Years with dividends plus buybacks above zero
    pub capital_return_years: usize,
    /// Years evaluated for capital return
    pub total_capital_return_years: usize,
}

/// Per-year figures shown alongside the moat scorecard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoatYearMetrics {
    /// Calendar year of the annual period end
    pub year: i32,
    /// Gross margin (%)
    pub gross_margin_pct: Option<f64>,
    /// Operating margin (%)
    pub operating_margin_pct: Option<f64>,
    /// Net cash flow over equity (%)
    pub roe_cf_pct: Option<f64>,
    /// Owner earnings over equity (%)
    pub roe_oe_pct: Option<f64>,
    /// Revenue
    pub revenue: Option<f64>,
}

/// Compute the moat metrics and the per-year trend table.
pub fn compute_moat_metrics(
    partitioned: &PartitionedFacts,
    price: Option<f64>,
    shares: Option<i64>,
    config: &ScoringConfig,
) -> (MoatDerivedMetrics, Vec<MoatYearMetrics>) {
    let chains = &config.chains;

    let mut gross_margin = Average::default();
    let mut operating_margin = Average::default();
    let mut roe_cf = Average::default();
    let mut roe_oe = Average::default();
    let mut owner_earnings = Average::default();
    let mut capex = Average::default();
    let mut positive_oe_years = 0;
    let mut capital_return_years = 0;

    let mut first_revenue: Option<(i32, f64)> = None;
    let mut last_revenue: Option<(i32, f64)> = None;
    let mut latest_operating: Option<(f64, Option<f64>)> = None;
    let mut trend = Vec::with_capacity(partitioned.annual.len());

    for (&year, snapshot) in &partitioned.annual {
        let revenue = resolve(snapshot, &chains.revenue, None);
        let gross_profit = resolve(snapshot, &chains.gross_profit, None).or_else(|| {
            revenue
                .zip(resolve(snapshot, &chains.cost_of_goods, None))
                .map(|(r, cogs)| r - cogs)
        });
        let operating_income = resolve(snapshot, &chains.operating_income, None);

        let margin = |amount: Option<f64>| {
            amount
                .zip(revenue)
                .and_then(|(a, r)| ratio(a, r))
                .map(|m| m * 100.0)
        };
        let gross_margin_pct = margin(gross_profit);
        let operating_margin_pct = margin(operating_income);
        gross_margin.push_opt(gross_margin_pct);
        operating_margin.push_opt(operating_margin_pct);

        if let Some(oi) = operating_income {
            latest_operating = Some((oi, resolve(snapshot, &chains.interest_expense, None)));
        }

        let equity = resolve_equity(snapshot, chains);
        let flows = YearFlows::resolve(snapshot, config);
        let on_equity = |amount: Option<f64>| {
            amount
                .zip(equity)
                .and_then(|(a, e)| ratio(100.0 * a, e))
        };
        let roe_cf_pct = on_equity(flows.net_cash_flow);
        let roe_oe_pct = on_equity(flows.owner_earnings);
        roe_cf.push_opt(roe_cf_pct);
        roe_oe.push_opt(roe_oe_pct);

        if let Some(oe) = flows.owner_earnings {
            owner_earnings.push(oe);
            if oe > 0.0 {
                positive_oe_years += 1;
            }
        }
        if flows.capex != 0.0 || flows.net_income.is_some() {
            capex.push(flows.capex);
        }

        if let Some(r) = revenue {
            if first_revenue.is_none() {
                first_revenue = Some((year, r));
            }
            last_revenue = Some((year, r));
        }

        if flows.dividends + flows.stock_repurchase > 0.0 {
            capital_return_years += 1;
        }

        trend.push(MoatYearMetrics {
            year,
            gross_margin_pct,
            operating_margin_pct,
            roe_cf_pct,
            roe_oe_pct,
            revenue,
        });
    }

    let revenue_cagr = first_revenue
        .zip(last_revenue)
        .and_then(|(first, last)| compound_growth(first, last));

    let capex_ratio = capex
        .mean()
        .zip(owner_earnings.mean())
        .and_then(|(c, oe)| ratio(c, oe))
        .map(|r| r * 100.0);

    let interest_coverage = latest_operating.and_then(|(oi, interest)| ratio(oi, interest?));

    let latest = &partitioned.latest;
    let debt = resolve(latest, &chains.debt, Some(0.0)).unwrap_or(0.0);
    let debt_to_equity = resolve_equity(latest, chains).and_then(|e| ratio(debt, e));

    let market_cap = price.zip(shares).map(|(p, s)| p * s as f64);
    let current_dividends = partitioned
        .most_recent_year()
        .and_then(|(_, snapshot)| resolve(snapshot, &chains.dividends, Some(0.0)));
    let estimated_return_oe = match (owner_earnings.mean(), current_dividends, market_cap) {
        (Some(oe), Some(div), Some(cap)) => ratio(100.0 * (oe - div), cap),
        _ => None,
    };

    let metrics = MoatDerivedMetrics {
        average_gross_margin: gross_margin.mean(),
        average_operating_margin: operating_margin.mean(),
        average_roe_cf: roe_cf.mean(),
        average_roe_oe: roe_oe.mean(),
        revenue_cagr,
        capex_ratio,
        interest_coverage,
        debt_to_equity,
        estimated_return_oe,
        current_dividends,
        market_cap,
        price_per_share: price,
        positive_oe_years,
        total_oe_years: owner_earnings.count(),
        capital_return_years,
        total_capital_return_years: partitioned.annual.len(),
    };

    (metrics, trend)
}

/// CAGR (%) between two `(year, revenue)` points; both revenues must be
/// positive and at least one year apart.
fn compound_growth(first: (i32, f64), last: (i32, f64)) -> Option<f64> {
    let ((first_year, first_revenue), (last_year, last_revenue)) = (first, last);
    let span = last_year - first_year;
    if span < 1 || first_revenue <= 0.0 || last_revenue <= 0.0 {
        return None;
    }

    let growth = (last_revenue / first_revenue).powf(1.0 / f64::from(span)) - 1.0;
    growth.is_finite().then_some(growth * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use tally_data::Fact;

    fn fact(concept: &str, value: f64, year: i32) -> Fact {
        Fact::annual(concept, value, NaiveDate::from_ymd_opt(year, 12, 31).unwrap())
    }

    #[test]
    fn test_revenue_cagr_over_five_years() {
        let config = ScoringConfig::default();
        let facts: Vec<Fact> = [1000.0, 1200.0, 1500.0, 1800.0, 2000.0]
            .iter()
            .enumerate()
            .map(|(i, r)| fact("Revenues", *r, 2019 + i as i32))
            .collect();
        let p = partition(&facts, &config);
        let (m, trend) = compute_moat_metrics(&p, None, None, &config);

        let expected = (2.0_f64.powf(0.25) - 1.0) * 100.0;
        assert_relative_eq!(m.revenue_cagr.unwrap(), expected, epsilon = 1e-9);
        assert_eq!(trend.len(), 5);
        assert_eq!(trend[0].revenue, Some(1000.0));
    }

    #[test]
    fn test_revenue_cagr_needs_two_years() {
        let config = ScoringConfig::default();
        let p = partition(&[fact("Revenues", 1000.0, 2023)], &config);
        let (m, _) = compute_moat_metrics(&p, None, None, &config);
        assert_eq!(m.revenue_cagr, None);
    }

    #[test]
    fn test_gross_profit_derived_from_cost_of_goods() {
        let config = ScoringConfig::default();
        let facts = vec![
            fact("Revenues", 200.0, 2023),
            fact("CostOfRevenue", 120.0, 2023),
            fact("OperatingIncomeLoss", 40.0, 2023),
        ];
        let p = partition(&facts, &config);
        let (m, trend) = compute_moat_metrics(&p, None, None, &config);

        assert_relative_eq!(m.average_gross_margin.unwrap(), 40.0);
        assert_relative_eq!(m.average_operating_margin.unwrap(), 20.0);
        assert_relative_eq!(trend[0].gross_margin_pct.unwrap(), 40.0);
    }

    #[test]
    fn test_interest_coverage_uses_latest_operating_year() {
        let config = ScoringConfig::default();
        let facts = vec![
            fact("OperatingIncomeLoss", 100.0, 2021),
            fact("InterestExpense", 10.0, 2021),
            fact("OperatingIncomeLoss", 90.0, 2022),
            fact("InterestExpense", 30.0, 2022),
            fact("Revenues", 500.0, 2023),
        ];
        let p = partition(&facts, &config);
        let (m, _) = compute_moat_metrics(&p, None, None, &config);
        assert_relative_eq!(m.interest_coverage.unwrap(), 3.0);

        let facts = vec![fact("OperatingIncomeLoss", 90.0, 2022)];
        let p = partition(&facts, &config);
        let (m, _) = compute_moat_metrics(&p, None, None, &config);
        assert_eq!(m.interest_coverage, None);
    }

    #[test]
    fn test_counters_and_capex_ratio() {
        let config = ScoringConfig::default();
        let facts = vec![
            fact("NetIncomeLoss", 100.0, 2021),
            fact("PaymentsToAcquirePropertyPlantAndEquipment", 20.0, 2021),
            fact("PaymentsOfDividends", 5.0, 2021),
            fact("NetIncomeLoss", -10.0, 2022),
            fact("PaymentsToAcquirePropertyPlantAndEquipment", 20.0, 2022),
            fact("Revenues", 10.0, 2023),
        ];
        let p = partition(&facts, &config);
        let (m, _) = compute_moat_metrics(&p, None, None, &config);

        assert_eq!(m.total_oe_years, 2);
        assert_eq!(m.positive_oe_years, 1);
        assert_eq!(m.capital_return_years, 1);
        assert_eq!(m.total_capital_return_years, 3);
        // OE: 80, -30 => avg 25; capex avg 20
        assert_relative_eq!(m.capex_ratio.unwrap(), 80.0);
    }

    #[test]
    fn test_roe_against_same_year_equity() {
        let config = ScoringConfig::default();
        let facts = vec![
            fact("NetIncomeLoss", 30.0, 2022),
            fact("StockholdersEquity", 200.0, 2022),
            fact("CashAndCashEquivalentsPeriodIncreaseDecrease", 20.0, 2022),
            fact("NetIncomeLoss", 30.0, 2023),
            fact("StockholdersEquity", 0.0, 2023),
        ];
        let p = partition(&facts, &config);
        let (m, trend) = compute_moat_metrics(&p, Some(10.0), Some(10), &config);

        assert_eq!(m.average_roe_oe, Some(15.0));
        assert_eq!(m.average_roe_cf, Some(10.0));
        assert_eq!(trend[1].roe_oe_pct, None);
        assert_eq!(m.debt_to_equity, None);
        assert_eq!(m.market_cap, Some(100.0));
        assert_relative_eq!(m.estimated_return_oe.unwrap(), 30.0);
    }
}
