//! Check Registry
//!
//! Static metadata for every scorecard check. The evaluator takes check names
//! and threshold text from here, so reports and documentation never drift
//! from the rules.

use serde::{Deserialize, Serialize};

/// Scorecard families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CheckFamily {
    /// Valuation and balance-sheet strength
    Value,
    /// Margin stability, growth and capital-return consistency
    Moat,
}

impl CheckFamily {
    /// Display label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Value => "Value",
            Self::Moat => "Moat",
        }
    }
}

/// Check metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInfo {
    /// 1-based position, stable across releases
    pub number: u8,
    /// Family the check belongs to
    pub family: CheckFamily,
    /// Check name
    pub name: &'static str,
    /// Threshold as shown to users
    pub threshold: &'static str,
    /// What the check measures
    pub description: &'static str,
}

const fn info(
    number: u8,
    family: CheckFamily,
    name: &'static str,
    threshold: &'static str,
    description: &'static str,
) -> CheckInfo {
    CheckInfo {
        number,
        family,
        name,
        threshold,
        description,
    }
}

/// Value scorecard checks in evaluation order.
pub const VALUE_CHECKS: [CheckInfo; 13] = [
    info(1, CheckFamily::Value, "Debt-to-Equity", "< 0.5", "Long-term debt over equity"),
    info(2, CheckFamily::Value, "Book Value", "> $150M", "Equity less goodwill and intangibles"),
    info(3, CheckFamily::Value, "Price-to-Book", "≤ 3.0", "Market cap over book value"),
    info(4, CheckFamily::Value, "Avg Net Cash Flow Positive", "> 0", "Mean cash change net of financing"),
    info(5, CheckFamily::Value, "Avg Owner Earnings Positive", "> 0", "Mean owner earnings"),
    info(6, CheckFamily::Value, "Est. Return (CF) Big Enough", "> 5%", "Cash-flow return on market cap"),
    info(7, CheckFamily::Value, "Est. Return (OE) Big Enough", "> 5%", "Owner-earnings return on market cap"),
    info(8, CheckFamily::Value, "Est. Return (CF) Not Too Big", "< 40%", "Cash-flow return is plausible"),
    info(9, CheckFamily::Value, "Est. Return (OE) Not Too Big", "< 40%", "Owner-earnings return is plausible"),
    info(10, CheckFamily::Value, "Debt-to-Book", "< 1.0", "Long-term debt over book value"),
    info(11, CheckFamily::Value, "Retained Earnings Positive", "> 0", "Adjusted retained earnings"),
    info(12, CheckFamily::Value, "History Long Enough", "≥ 4 years", "Annual years of data"),
    info(13, CheckFamily::Value, "Retained Earnings Increased", "increased", "Adjusted retained earnings above the oldest year"),
];

/// Moat scorecard checks in evaluation order.
pub const MOAT_CHECKS: [CheckInfo; 13] = [
    info(1, CheckFamily::Moat, "High ROE (CF) avg", ">= 15%", "Mean net cash flow over equity"),
    info(2, CheckFamily::Moat, "High ROE (OE) avg", ">= 15%", "Mean owner earnings over equity"),
    info(3, CheckFamily::Moat, "Gross margin avg", ">= 40%", "Mean gross margin"),
    info(4, CheckFamily::Moat, "Operating margin avg", ">= 15%", "Mean operating margin"),
    info(5, CheckFamily::Moat, "Revenue growth", "> 3%", "Revenue CAGR"),
    info(6, CheckFamily::Moat, "Positive OE every year", "0 failing years", "Years with non-positive owner earnings"),
    info(7, CheckFamily::Moat, "Low capex ratio", "< 50%", "Mean capex over mean owner earnings"),
    info(8, CheckFamily::Moat, "Consistent dividend/buyback", ">= 75% of years", "Years without dividends or buybacks"),
    info(9, CheckFamily::Moat, "Debt-to-equity", "< 1.0", "Long-term debt over equity"),
    info(10, CheckFamily::Moat, "Interest coverage", "> 5x", "Operating income over interest expense"),
    info(11, CheckFamily::Moat, "History", ">= 7 years", "Annual years of data"),
    info(12, CheckFamily::Moat, "Est. return (OE) floor", "> 3%", "Owner-earnings return on market cap"),
    info(13, CheckFamily::Moat, "Est. return (OE) cap", "< 40%", "Owner-earnings return is plausible"),
];

/// Checks of one family, in evaluation order.
pub const fn checks_for(family: CheckFamily) -> &'static [CheckInfo; 13] {
    match family {
        CheckFamily::Value => &VALUE_CHECKS,
        CheckFamily::Moat => &MOAT_CHECKS,
    }
}

/// Get all check info across both families
pub fn available_checks() -> Vec<CheckInfo> {
    VALUE_CHECKS.iter().chain(MOAT_CHECKS.iter()).copied().collect()
}

/// Get check info by family and 1-based number
pub fn get_check_info(family: CheckFamily, number: u8) -> Option<CheckInfo> {
    checks_for(family)
        .iter()
        .find(|c| c.number == number)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_are_sequential() {
        for family in [CheckFamily::Value, CheckFamily::Moat] {
            for (i, check) in checks_for(family).iter().enumerate() {
                assert_eq!(check.number as usize, i + 1);
                assert_eq!(check.family, family);
            }
        }
    }

    #[test]
    fn test_available_checks() {
        let checks = available_checks();
        assert_eq!(checks.len(), 26);
    }

    #[test]
    fn test_get_check_info() {
        let check = get_check_info(CheckFamily::Moat, 11).unwrap();
        assert_eq!(check.name, "History");
        assert_eq!(check.threshold, ">= 7 years");

        assert!(get_check_info(CheckFamily::Value, 14).is_none());
        assert!(get_check_info(CheckFamily::Value, 0).is_none());
    }

    #[test]
    fn test_names_unique_within_family() {
        for family in [CheckFamily::Value, CheckFamily::Moat] {
            let checks = checks_for(family);
            for (i, a) in checks.iter().enumerate() {
                for b in &checks[i + 1..] {
                    assert_ne!(a.name, b.name);
                }
            }
        }
    }
}
