//! Checks evaluation.
//!
//! Each family evaluates exactly 13 checks in registry order. A check is
//! `NotAvailable` only when a metric it needs is missing; otherwise it passes
//! or fails by its threshold.

use crate::moat::MoatDerivedMetrics;
use crate::registry::{CheckFamily, CheckInfo, checks_for};
use crate::value::DerivedMetrics;
use serde::{Deserialize, Serialize};

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckResult {
    /// Threshold met
    Pass,
    /// Threshold not met
    Fail,
    /// Required metric unavailable
    NotAvailable,
}

impl CheckResult {
    /// Short label for reports.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::NotAvailable => "N/A",
        }
    }

    const fn from_bool(pass: bool) -> Self {
        if pass { Self::Pass } else { Self::Fail }
    }
}

/// One evaluated check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringCheck {
    /// 1-based, stable position
    pub check_number: u8,
    /// Check name
    pub name: String,
    /// The value compared against the threshold, when computable
    pub computed_value: Option<f64>,
    /// Threshold as shown to users
    pub threshold: String,
    /// Outcome
    pub result: CheckResult,
}

impl ScoringCheck {
    fn new(info: &CheckInfo, computed_value: Option<f64>, result: CheckResult) -> Self {
        Self {
            check_number: info.number,
            name: info.name.to_string(),
            computed_value,
            threshold: info.threshold.to_string(),
            result,
        }
    }

    /// Evaluate a single-metric threshold rule.
    fn threshold(info: &CheckInfo, value: Option<f64>, pass: impl Fn(f64) -> bool) -> Self {
        let result = value.map_or(CheckResult::NotAvailable, |v| CheckResult::from_bool(pass(v)));
        Self::new(info, value, result)
    }
}

/// The ordered checks of one family with their totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    /// Checks in registry order
    pub checks: Vec<ScoringCheck>,
    /// Number of passing checks
    pub overall_score: usize,
    /// Number of checks that passed or failed
    pub computable_checks: usize,
}

impl Scorecard {
    /// Count passes and computable checks. Order is preserved.
    pub fn tally(checks: Vec<ScoringCheck>) -> Self {
        let overall_score = checks
            .iter()
            .filter(|c| c.result == CheckResult::Pass)
            .count();
        let computable_checks = checks
            .iter()
            .filter(|c| c.result != CheckResult::NotAvailable)
            .count();

        Self {
            checks,
            overall_score,
            computable_checks,
        }
    }
}

/// Evaluate the 13 value checks.
pub fn evaluate_value_checks(metrics: &DerivedMetrics, years_of_data: usize) -> Vec<ScoringCheck> {
    let [
        debt_to_equity,
        book_value,
        price_to_book,
        avg_ncf,
        avg_oe,
        return_cf_floor,
        return_oe_floor,
        return_cf_cap,
        return_oe_cap,
        debt_to_book,
        retained_positive,
        history,
        retained_increased,
    ] = checks_for(CheckFamily::Value);

    let years = years_of_data as f64;
    let retained_growth = metrics
        .adjusted_retained_earnings
        .zip(metrics.oldest_retained_earnings)
        .map(|(adjusted, oldest)| adjusted - oldest);

    vec![
        ScoringCheck::threshold(debt_to_equity, metrics.debt_to_equity, |v| v < 0.5),
        ScoringCheck::threshold(book_value, metrics.book_value, |v| v > 150_000_000.0),
        ScoringCheck::threshold(price_to_book, metrics.price_to_book, |v| v <= 3.0),
        ScoringCheck::threshold(avg_ncf, metrics.average_net_cash_flow, |v| v > 0.0),
        ScoringCheck::threshold(avg_oe, metrics.average_owner_earnings, |v| v > 0.0),
        ScoringCheck::threshold(return_cf_floor, metrics.estimated_return_cf, |v| v > 5.0),
        ScoringCheck::threshold(return_oe_floor, metrics.estimated_return_oe, |v| v > 5.0),
        ScoringCheck::threshold(return_cf_cap, metrics.estimated_return_cf, |v| v < 40.0),
        ScoringCheck::threshold(return_oe_cap, metrics.estimated_return_oe, |v| v < 40.0),
        ScoringCheck::threshold(debt_to_book, metrics.debt_to_book, |v| v < 1.0),
        ScoringCheck::threshold(retained_positive, metrics.adjusted_retained_earnings, |v| {
            v > 0.0
        }),
        ScoringCheck::threshold(history, Some(years), |v| v >= 4.0),
        ScoringCheck::threshold(retained_increased, retained_growth, |v| v > 0.0),
    ]
}

/// Evaluate the 13 moat checks.
pub fn evaluate_moat_checks(metrics: &MoatDerivedMetrics, years_of_data: usize) -> Vec<ScoringCheck> {
    let [
        roe_cf,
        roe_oe,
        gross_margin,
        operating_margin,
        revenue_growth,
        positive_oe,
        capex_ratio,
        capital_return,
        debt_to_equity,
        interest_coverage,
        history,
        return_floor,
        return_cap,
    ] = checks_for(CheckFamily::Moat);

    let failing_oe_years = metrics.total_oe_years - metrics.positive_oe_years.min(metrics.total_oe_years);
    let positive_oe_check = if metrics.total_oe_years > 0 {
        ScoringCheck::new(
            positive_oe,
            Some(failing_oe_years as f64),
            CheckResult::from_bool(failing_oe_years == 0),
        )
    } else {
        ScoringCheck::new(positive_oe, None, CheckResult::NotAvailable)
    };

    let total_return_years = metrics.total_capital_return_years;
    let capital_return_check = if total_return_years > 0 {
        let returning = metrics.capital_return_years.min(total_return_years);
        ScoringCheck::new(
            capital_return,
            Some((total_return_years - returning) as f64),
            CheckResult::from_bool(returning as f64 >= 0.75 * total_return_years as f64),
        )
    } else {
        ScoringCheck::new(capital_return, None, CheckResult::NotAvailable)
    };

    vec![
        ScoringCheck::threshold(roe_cf, metrics.average_roe_cf, |v| v >= 15.0),
        ScoringCheck::threshold(roe_oe, metrics.average_roe_oe, |v| v >= 15.0),
        ScoringCheck::threshold(gross_margin, metrics.average_gross_margin, |v| v >= 40.0),
        ScoringCheck::threshold(operating_margin, metrics.average_operating_margin, |v| {
            v >= 15.0
        }),
        ScoringCheck::threshold(revenue_growth, metrics.revenue_cagr, |v| v > 3.0),
        positive_oe_check,
        ScoringCheck::threshold(capex_ratio, metrics.capex_ratio, |v| v < 50.0),
        capital_return_check,
        ScoringCheck::threshold(debt_to_equity, metrics.debt_to_equity, |v| v < 1.0),
        ScoringCheck::threshold(interest_coverage, metrics.interest_coverage, |v| v > 5.0),
        ScoringCheck::threshold(history, Some(years_of_data as f64), |v| v >= 7.0),
        ScoringCheck::threshold(return_floor, metrics.estimated_return_oe, |v| v > 3.0),
        ScoringCheck::threshold(return_cap, metrics.estimated_return_oe, |v| v < 40.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn results(checks: &[ScoringCheck]) -> Vec<CheckResult> {
        checks.iter().map(|c| c.result).collect()
    }

    #[test]
    fn test_empty_value_metrics_only_history_computable() {
        let checks = evaluate_value_checks(&DerivedMetrics::default(), 0);
        assert_eq!(checks.len(), 13);

        let card = Scorecard::tally(checks);
        assert_eq!(card.overall_score, 0);
        assert_eq!(card.computable_checks, 1);
        assert_eq!(card.checks[11].result, CheckResult::Fail);
        assert_eq!(card.checks[11].computed_value, Some(0.0));
    }

    #[test]
    fn test_value_checks_thresholds() {
        let metrics = DerivedMetrics {
            book_value: Some(200_000_000.0),
            market_cap: Some(400_000_000.0),
            debt_to_equity: Some(0.5),
            price_to_book: Some(3.0),
            debt_to_book: Some(0.4),
            adjusted_retained_earnings: Some(50.0),
            oldest_retained_earnings: Some(20.0),
            average_net_cash_flow: Some(10.0),
            average_owner_earnings: Some(-1.0),
            estimated_return_cf: Some(45.0),
            estimated_return_oe: Some(5.0),
            current_dividends: Some(0.0),
        };
        let checks = evaluate_value_checks(&metrics, 4);

        use CheckResult::{Fail, Pass};
        assert_eq!(
            results(&checks),
            vec![Fail, Pass, Pass, Pass, Fail, Pass, Fail, Fail, Pass, Pass, Pass, Pass, Pass]
        );
        assert_eq!(checks[12].computed_value, Some(30.0));
        assert_eq!(checks[12].threshold, "increased");
    }

    #[rstest]
    #[case(4, 4, CheckResult::Pass, 0.0)]
    #[case(4, 3, CheckResult::Pass, 1.0)]
    #[case(8, 5, CheckResult::Fail, 3.0)]
    #[case(0, 0, CheckResult::NotAvailable, f64::NAN)]
    fn test_capital_return_counter(
        #[case] total: usize,
        #[case] returning: usize,
        #[case] expected: CheckResult,
        #[case] failing: f64,
    ) {
        let metrics = MoatDerivedMetrics {
            capital_return_years: returning,
            total_capital_return_years: total,
            ..Default::default()
        };
        let check = &evaluate_moat_checks(&metrics, 0)[7];
        assert_eq!(check.check_number, 8);
        assert_eq!(check.result, expected);
        if expected == CheckResult::NotAvailable {
            assert_eq!(check.computed_value, None);
        } else {
            assert_eq!(check.computed_value, Some(failing));
        }
    }

    #[test]
    fn test_positive_oe_counter() {
        let mut metrics = MoatDerivedMetrics {
            positive_oe_years: 6,
            total_oe_years: 7,
            ..Default::default()
        };
        let check = &evaluate_moat_checks(&metrics, 7)[5];
        assert_eq!(check.result, CheckResult::Fail);
        assert_eq!(check.computed_value, Some(1.0));

        metrics.positive_oe_years = 7;
        assert_eq!(evaluate_moat_checks(&metrics, 7)[5].result, CheckResult::Pass);

        metrics.total_oe_years = 0;
        metrics.positive_oe_years = 0;
        assert_eq!(
            evaluate_moat_checks(&metrics, 7)[5].result,
            CheckResult::NotAvailable
        );
    }

    #[test]
    fn test_check_numbers_follow_registry_order() {
        let value = evaluate_value_checks(&DerivedMetrics::default(), 5);
        let moat = evaluate_moat_checks(&MoatDerivedMetrics::default(), 5);
        for (i, (v, m)) in value.iter().zip(&moat).enumerate() {
            assert_eq!(v.check_number as usize, i + 1);
            assert_eq!(m.check_number as usize, i + 1);
        }
        assert_eq!(moat[10].name, "History");
        assert_eq!(moat[10].result, CheckResult::Fail);
    }
}
