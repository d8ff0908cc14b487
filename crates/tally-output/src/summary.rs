//! Per-company summary rows.
//!
//! A summary flattens one company's scorecard into a single row: identity
//! columns, the score counters, the family's headline metrics and the price
//! context. Rows are plain values; a new run produces new rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_data::Company;
use tally_scoring::{MoatScoringResult, ScoringResult};

/// Value scorecard summary for one company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyScoreSummary {
    /// Company identifier
    pub company_id: u64,
    /// SEC central index key
    pub cik: String,
    /// Company name
    pub company_name: Option<String>,
    /// Primary ticker
    pub ticker: Option<String>,
    /// Listing exchange
    pub exchange: Option<String>,
    /// Passing checks
    pub overall_score: usize,
    /// Checks that passed or failed
    pub computable_checks: usize,
    /// Annual years available
    pub years_of_data: usize,
    /// Equity less goodwill and intangibles
    pub book_value: Option<f64>,
    /// Price times shares outstanding
    pub market_cap: Option<f64>,
    /// Long-term debt over equity
    pub debt_to_equity_ratio: Option<f64>,
    /// Market cap over book value
    pub price_to_book_ratio: Option<f64>,
    /// Long-term debt over book value
    pub debt_to_book_ratio: Option<f64>,
    /// Retained earnings with distributions added back
    pub adjusted_retained_earnings: Option<f64>,
    /// Mean annual net cash flow
    pub average_net_cash_flow: Option<f64>,
    /// Mean annual owner earnings
    pub average_owner_earnings: Option<f64>,
    /// Estimated return, cash-flow basis (%)
    pub estimated_return_cf: Option<f64>,
    /// Estimated return, owner-earnings basis (%)
    pub estimated_return_oe: Option<f64>,
    /// Price per share
    pub price_per_share: Option<f64>,
    /// Date of the price
    pub price_date: Option<NaiveDate>,
    /// Shares outstanding
    pub shares_outstanding: Option<i64>,
    /// Dividends paid in the most recent annual year
    pub current_dividends_paid: Option<f64>,
    /// Highest price per share the value rules would pay
    pub max_buy_price: Option<f64>,
    /// Upside of the max buy price over the current price (%)
    pub percentage_upside: Option<f64>,
    /// When the row was computed
    pub computed_at: DateTime<Utc>,
}

impl CompanyScoreSummary {
    /// Flatten a value scorecard.
    pub fn from_result(company: &Company, result: &ScoringResult, computed_at: DateTime<Utc>) -> Self {
        let m = &result.metrics;
        Self {
            company_id: company.company_id,
            cik: company.cik.clone(),
            company_name: company.name.clone(),
            ticker: company.ticker.clone(),
            exchange: company.exchange.clone(),
            overall_score: result.overall_score,
            computable_checks: result.computable_checks,
            years_of_data: result.years_of_data,
            book_value: m.book_value,
            market_cap: m.market_cap,
            debt_to_equity_ratio: m.debt_to_equity,
            price_to_book_ratio: m.price_to_book,
            debt_to_book_ratio: m.debt_to_book,
            adjusted_retained_earnings: m.adjusted_retained_earnings,
            average_net_cash_flow: m.average_net_cash_flow,
            average_owner_earnings: m.average_owner_earnings,
            estimated_return_cf: m.estimated_return_cf,
            estimated_return_oe: m.estimated_return_oe,
            price_per_share: result.price.price_per_share,
            price_date: result.price.price_date,
            shares_outstanding: result.price.shares_outstanding,
            current_dividends_paid: m.current_dividends,
            max_buy_price: result.max_buy_price,
            percentage_upside: result.percentage_upside,
            computed_at,
        }
    }

    /// Ticker, or the CIK when the company has no listing.
    pub fn label(&self) -> &str {
        self.ticker.as_deref().unwrap_or(&self.cik)
    }
}

impl fmt::Display for CompanyScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} value checks over {} years",
            self.label(),
            self.overall_score,
            self.computable_checks,
            self.years_of_data
        )
    }
}

/// Moat scorecard summary for one company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyMoatScoreSummary {
    /// Company identifier
    pub company_id: u64,
    /// SEC central index key
    pub cik: String,
    /// Company name
    pub company_name: Option<String>,
    /// Primary ticker
    pub ticker: Option<String>,
    /// Listing exchange
    pub exchange: Option<String>,
    /// Passing checks
    pub overall_score: usize,
    /// Checks that passed or failed
    pub computable_checks: usize,
    /// Annual years available
    pub years_of_data: usize,
    /// Mean gross margin (%)
    pub average_gross_margin: Option<f64>,
    /// Mean operating margin (%)
    pub average_operating_margin: Option<f64>,
    /// Mean cash-flow return on equity (%)
    pub average_roe_cf: Option<f64>,
    /// Mean owner-earnings return on equity (%)
    pub average_roe_oe: Option<f64>,
    /// Estimated return, owner-earnings basis (%)
    pub estimated_return_oe: Option<f64>,
    /// Revenue CAGR (%)
    pub revenue_cagr: Option<f64>,
    /// Capex over owner earnings (%)
    pub capex_ratio: Option<f64>,
    /// Operating income over interest expense
    pub interest_coverage: Option<f64>,
    /// Long-term debt over equity
    pub debt_to_equity_ratio: Option<f64>,
    /// Price per share
    pub price_per_share: Option<f64>,
    /// Date of the price
    pub price_date: Option<NaiveDate>,
    /// Shares outstanding
    pub shares_outstanding: Option<i64>,
    /// When the row was computed
    pub computed_at: DateTime<Utc>,
}

impl CompanyMoatScoreSummary {
    /// Flatten a moat scorecard.
    pub fn from_result(
        company: &Company,
        result: &MoatScoringResult,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let m = &result.metrics;
        Self {
            company_id: company.company_id,
            cik: company.cik.clone(),
            company_name: company.name.clone(),
            ticker: company.ticker.clone(),
            exchange: company.exchange.clone(),
            overall_score: result.overall_score,
            computable_checks: result.computable_checks,
            years_of_data: result.years_of_data,
            average_gross_margin: m.average_gross_margin,
            average_operating_margin: m.average_operating_margin,
            average_roe_cf: m.average_roe_cf,
            average_roe_oe: m.average_roe_oe,
            estimated_return_oe: m.estimated_return_oe,
            revenue_cagr: m.revenue_cagr,
            capex_ratio: m.capex_ratio,
            interest_coverage: m.interest_coverage,
            debt_to_equity_ratio: m.debt_to_equity,
            price_per_share: result.price.price_per_share,
            price_date: result.price.price_date,
            shares_outstanding: result.price.shares_outstanding,
            computed_at,
        }
    }

    /// Ticker, or the CIK when the company has no listing.
    pub fn label(&self) -> &str {
        self.ticker.as_deref().unwrap_or(&self.cik)
    }
}

impl fmt::Display for CompanyMoatScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} moat checks over {} years",
            self.label(),
            self.overall_score,
            self.computable_checks,
            self.years_of_data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_data::Fact;
    use tally_scoring::{ScoringConfig, partition};

    #[test]
    fn test_summary_copies_result_fields() {
        let config = ScoringConfig::default();
        let period_end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let facts = vec![
            Fact::annual("StockholdersEquity", 500.0, period_end),
            Fact::annual("NetIncomeLoss", 40.0, period_end),
        ];
        let p = partition(&facts, &config);
        let result = ScoringResult::compute(&p, None, &config);
        let company = Company::new(7, "0000000007")
            .with_name("Acme Corp")
            .with_listing("ACME", Some("NYSE".to_string()));

        let now = Utc::now();
        let summary = CompanyScoreSummary::from_result(&company, &result, now);
        assert_eq!(summary.company_id, 7);
        assert_eq!(summary.ticker.as_deref(), Some("ACME"));
        assert_eq!(summary.book_value, Some(500.0));
        assert_eq!(summary.average_owner_earnings, Some(40.0));
        assert_eq!(summary.years_of_data, 1);
        assert_eq!(summary.computed_at, now);
        assert!(summary.to_string().starts_with("ACME:"));

        let moat = MoatScoringResult::compute(&p, None, &config);
        let moat_summary = CompanyMoatScoreSummary::from_result(&company, &moat, now);
        assert_eq!(moat_summary.overall_score, moat.overall_score);
        assert_eq!(moat_summary.exchange.as_deref(), Some("NYSE"));
    }

    #[test]
    fn test_label_falls_back_to_cik() {
        let config = ScoringConfig::default();
        let p = partition(&[], &config);
        let result = ScoringResult::compute(&p, None, &config);
        let summary =
            CompanyScoreSummary::from_result(&Company::new(1, "0000320193"), &result, Utc::now());
        assert_eq!(summary.label(), "0000320193");
    }
}
