//! Report generation: sorting and filtering of summary rows and ASCII tables
//! for terminal output.

use crate::summary::{CompanyMoatScoreSummary, CompanyScoreSummary};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tally_scoring::{MoatScoringResult, ScoringCheck, ScoringResult};

/// Sort keys for value summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoresSortBy {
    /// Passing checks
    #[default]
    OverallScore,
    /// Book value
    BookValue,
    /// Market cap
    MarketCap,
    /// Estimated return, cash-flow basis
    EstimatedReturnCf,
    /// Estimated return, owner-earnings basis
    EstimatedReturnOe,
    /// Debt to equity
    DebtToEquityRatio,
    /// Price to book
    PriceToBookRatio,
    /// Max buy price
    MaxBuyPrice,
    /// Percentage upside
    PercentageUpside,
}

impl ScoresSortBy {
    /// Sort key of a row; `None` sorts last.
    pub fn key(&self, row: &CompanyScoreSummary) -> Option<f64> {
        match self {
            Self::OverallScore => Some(row.overall_score as f64),
            Self::BookValue => row.book_value,
            Self::MarketCap => row.market_cap,
            Self::EstimatedReturnCf => row.estimated_return_cf,
            Self::EstimatedReturnOe => row.estimated_return_oe,
            Self::DebtToEquityRatio => row.debt_to_equity_ratio,
            Self::PriceToBookRatio => row.price_to_book_ratio,
            Self::MaxBuyPrice => row.max_buy_price,
            Self::PercentageUpside => row.percentage_upside,
        }
    }
}

impl FromStr for ScoresSortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "score" | "overall-score" => Ok(Self::OverallScore),
            "book-value" => Ok(Self::BookValue),
            "market-cap" => Ok(Self::MarketCap),
            "return-cf" | "estimated-return-cf" => Ok(Self::EstimatedReturnCf),
            "return-oe" | "estimated-return-oe" => Ok(Self::EstimatedReturnOe),
            "debt-to-equity" => Ok(Self::DebtToEquityRatio),
            "price-to-book" => Ok(Self::PriceToBookRatio),
            "max-buy" | "max-buy-price" => Ok(Self::MaxBuyPrice),
            "upside" | "percentage-upside" => Ok(Self::PercentageUpside),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// Sort keys for moat summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoatScoresSortBy {
    /// Passing checks
    #[default]
    OverallScore,
    /// Gross margin
    AverageGrossMargin,
    /// Operating margin
    AverageOperatingMargin,
    /// Cash-flow return on equity
    AverageRoeCf,
    /// Owner-earnings return on equity
    AverageRoeOe,
    /// Estimated return, owner-earnings basis
    EstimatedReturnOe,
    /// Revenue growth
    RevenueCagr,
    /// Capex ratio
    CapexRatio,
    /// Interest coverage
    InterestCoverage,
    /// Debt to equity
    DebtToEquityRatio,
}

impl MoatScoresSortBy {
    /// Sort key of a row; `None` sorts last.
    pub fn key(&self, row: &CompanyMoatScoreSummary) -> Option<f64> {
        match self {
            Self::OverallScore => Some(row.overall_score as f64),
            Self::AverageGrossMargin => row.average_gross_margin,
            Self::AverageOperatingMargin => row.average_operating_margin,
            Self::AverageRoeCf => row.average_roe_cf,
            Self::AverageRoeOe => row.average_roe_oe,
            Self::EstimatedReturnOe => row.estimated_return_oe,
            Self::RevenueCagr => row.revenue_cagr,
            Self::CapexRatio => row.capex_ratio,
            Self::InterestCoverage => row.interest_coverage,
            Self::DebtToEquityRatio => row.debt_to_equity_ratio,
        }
    }
}

impl FromStr for MoatScoresSortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "score" | "overall-score" => Ok(Self::OverallScore),
            "gross-margin" => Ok(Self::AverageGrossMargin),
            "operating-margin" => Ok(Self::AverageOperatingMargin),
            "roe-cf" => Ok(Self::AverageRoeCf),
            "roe-oe" => Ok(Self::AverageRoeOe),
            "return-oe" | "estimated-return-oe" => Ok(Self::EstimatedReturnOe),
            "revenue-cagr" | "growth" => Ok(Self::RevenueCagr),
            "capex-ratio" => Ok(Self::CapexRatio),
            "interest-coverage" => Ok(Self::InterestCoverage),
            "debt-to-equity" => Ok(Self::DebtToEquityRatio),
            _ => Err(format!("Unknown sort key: {}", s)),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    #[default]
    Descending,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(format!("Unknown sort direction: {}", s)),
        }
    }
}

/// Row filter shared by both families.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoresFilter {
    /// Keep rows scoring at least this many passes
    pub min_score: Option<usize>,
    /// Keep rows scoring at most this many passes
    pub max_score: Option<usize>,
    /// Keep rows listed on this exchange (case-insensitive)
    pub exchange: Option<String>,
}

impl ScoresFilter {
    /// Whether a row with this score and exchange passes the filter.
    pub fn matches(&self, overall_score: usize, exchange: Option<&str>) -> bool {
        if self.min_score.is_some_and(|min| overall_score < min) {
            return false;
        }
        if self.max_score.is_some_and(|max| overall_score > max) {
            return false;
        }
        match self.exchange.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(wanted) => exchange.is_some_and(|e| e.eq_ignore_ascii_case(wanted)),
            None => true,
        }
    }
}

/// Compare two optional keys; missing keys sort last in either direction.
fn compare_keys(a: Option<f64>, b: Option<f64>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match direction {
            SortDirection::Ascending => a.total_cmp(&b),
            SortDirection::Descending => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Filter and sort value summaries. Ties break on company id.
pub fn select_scores(
    rows: &[CompanyScoreSummary],
    filter: &ScoresFilter,
    sort_by: ScoresSortBy,
    direction: SortDirection,
) -> Vec<CompanyScoreSummary> {
    let mut selected: Vec<CompanyScoreSummary> = rows
        .iter()
        .filter(|r| filter.matches(r.overall_score, r.exchange.as_deref()))
        .cloned()
        .collect();
    selected.sort_by(|a, b| {
        compare_keys(sort_by.key(a), sort_by.key(b), direction)
            .then(a.company_id.cmp(&b.company_id))
    });
    selected
}

/// Filter and sort moat summaries. Ties break on company id.
pub fn select_moat_scores(
    rows: &[CompanyMoatScoreSummary],
    filter: &ScoresFilter,
    sort_by: MoatScoresSortBy,
    direction: SortDirection,
) -> Vec<CompanyMoatScoreSummary> {
    let mut selected: Vec<CompanyMoatScoreSummary> = rows
        .iter()
        .filter(|r| filter.matches(r.overall_score, r.exchange.as_deref()))
        .cloned()
        .collect();
    selected.sort_by(|a, b| {
        compare_keys(sort_by.key(a), sort_by.key(b), direction)
            .then(a.company_id.cmp(&b.company_id))
    });
    selected
}

/// Optional number formatted to `precision` places, `-` when missing.
struct Cell(Option<f64>, usize);

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => f.pad(&format!("{:.*}", self.1, v)),
            None => f.pad("-"),
        }
    }
}

fn push_checks(output: &mut String, checks: &[ScoringCheck]) {
    output.push_str(&format!(
        "{:>3} {:<32} {:>16} {:>18} {:>6}\n",
        "#", "Check", "Value", "Threshold", "Result"
    ));
    output.push_str(&"-".repeat(80));
    output.push('\n');
    for check in checks {
        output.push_str(&format!(
            "{:>3} {:<32} {:>16} {:>18} {:>6}\n",
            check.check_number,
            check.name,
            Cell(check.computed_value, 2),
            check.threshold,
            check.result.label()
        ));
    }
    output.push_str(&"-".repeat(80));
    output.push('\n');
}

/// ASCII value scorecard for one company.
pub fn value_scorecard_table(title: &str, result: &ScoringResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("\nValue Scorecard: {}\n", title));
    output.push_str(&format!("Years of data: {}\n", result.years_of_data));
    output.push_str(&"=".repeat(80));
    output.push('\n');

    push_checks(&mut output, &result.checks);

    output.push_str(&format!(
        "Score: {} / {} computable\n",
        result.overall_score, result.computable_checks
    ));
    output.push_str(&format!(
        "Price: {}   Max buy: {}   Upside: {}%\n",
        Cell(result.price.price_per_share, 2),
        Cell(result.max_buy_price, 2),
        Cell(result.percentage_upside, 1)
    ));
    output.push_str(&"=".repeat(80));
    output.push('\n');

    output
}

/// ASCII moat scorecard for one company, followed by the per-year trend.
pub fn moat_scorecard_table(title: &str, result: &MoatScoringResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("\nMoat Scorecard: {}\n", title));
    output.push_str(&format!("Years of data: {}\n", result.years_of_data));
    output.push_str(&"=".repeat(80));
    output.push('\n');

    push_checks(&mut output, &result.checks);

    output.push_str(&format!(
        "Score: {} / {} computable\n",
        result.overall_score, result.computable_checks
    ));
    output.push_str(&"=".repeat(80));
    output.push('\n');

    if !result.trend.is_empty() {
        output.push_str(&format!(
            "{:<6} {:>18} {:>12} {:>12} {:>10} {:>10}\n",
            "Year", "Revenue", "Gross %", "Oper. %", "ROE CF %", "ROE OE %"
        ));
        output.push_str(&"-".repeat(80));
        output.push('\n');
        for year in &result.trend {
            output.push_str(&format!(
                "{:<6} {:>18} {:>12} {:>12} {:>10} {:>10}\n",
                year.year,
                Cell(year.revenue, 0),
                Cell(year.gross_margin_pct, 1),
                Cell(year.operating_margin_pct, 1),
                Cell(year.roe_cf_pct, 1),
                Cell(year.roe_oe_pct, 1)
            ));
        }
        output.push_str(&"=".repeat(80));
        output.push('\n');
    }

    output
}

/// ASCII listing of value summaries.
pub fn scores_table(rows: &[CompanyScoreSummary]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<10} {:<8} {:>7} {:>6} {:>18} {:>8} {:>8} {:>10} {:>9}\n",
        "Ticker", "Exchange", "Score", "Years", "Market Cap", "D/E", "P/B", "Max Buy", "Upside %"
    ));
    output.push_str(&"-".repeat(92));
    output.push('\n');
    for row in rows {
        output.push_str(&format!(
            "{:<10} {:<8} {:>7} {:>6} {:>18} {:>8} {:>8} {:>10} {:>9}\n",
            row.label(),
            row.exchange.as_deref().unwrap_or("-"),
            format!("{}/{}", row.overall_score, row.computable_checks),
            row.years_of_data,
            Cell(row.market_cap, 0),
            Cell(row.debt_to_equity_ratio, 2),
            Cell(row.price_to_book_ratio, 2),
            Cell(row.max_buy_price, 2),
            Cell(row.percentage_upside, 1)
        ));
    }

    output
}

/// ASCII listing of moat summaries.
pub fn moat_scores_table(rows: &[CompanyMoatScoreSummary]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<10} {:<8} {:>7} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
        "Ticker", "Exchange", "Score", "Years", "Gross %", "Oper. %", "ROE OE %", "CAGR %", "Cover."
    ));
    output.push_str(&"-".repeat(84));
    output.push('\n');
    for row in rows {
        output.push_str(&format!(
            "{:<10} {:<8} {:>7} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9}\n",
            row.label(),
            row.exchange.as_deref().unwrap_or("-"),
            format!("{}/{}", row.overall_score, row.computable_checks),
            row.years_of_data,
            Cell(row.average_gross_margin, 1),
            Cell(row.average_operating_margin, 1),
            Cell(row.average_roe_oe, 1),
            Cell(row.revenue_cagr, 1),
            Cell(row.interest_coverage, 1)
        ));
    }

    output
}
