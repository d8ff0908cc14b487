//! Extracted US-GAAP facts.
//!
//! A [`Fact`] is a single numeric value reported under a taxonomy concept name
//! for one period end. Facts arrive already extracted from filings; this crate
//! never parses raw XBRL.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Accounting balance polarity of a concept.
///
/// `Credit` marks asset-like concepts (a reported increase is a cash outflow in
/// a cash-flow reconciliation); `Debit` marks liability-like concepts (a
/// reported increase is a cash inflow).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalancePolarity {
    /// No polarity recorded
    #[default]
    None,
    /// Asset-like concept
    Credit,
    /// Liability-like concept
    Debit,
    /// Polarity does not apply (ratios, share counts)
    NotApplicable,
}

impl BalancePolarity {
    /// Convert to database integer representation.
    pub const fn to_db_id(&self) -> i64 {
        match self {
            Self::None => 0,
            Self::Credit => 1,
            Self::Debit => 2,
            Self::NotApplicable => 3,
        }
    }

    /// Parse from database integer representation.
    pub fn from_db_id(id: i64) -> Result<Self> {
        match id {
            0 => Ok(Self::None),
            1 => Ok(Self::Credit),
            2 => Ok(Self::Debit),
            3 => Ok(Self::NotApplicable),
            _ => Err(DataError::Parse(format!("Invalid balance polarity: {}", id))),
        }
    }
}

/// Filing frequency of the submission a fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilingFrequency {
    /// Annual report (10-K)
    Annual,
    /// Interim report (10-Q)
    Interim,
    /// Anything else (8-K, S-1, ...)
    Other,
}

impl FilingFrequency {
    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Annual => "A",
            Self::Interim => "Q",
            Self::Other => "O",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "A" => Ok(Self::Annual),
            "Q" => Ok(Self::Interim),
            "O" => Ok(Self::Other),
            _ => Err(DataError::Parse(format!("Invalid filing frequency: {}", s))),
        }
    }

    /// Annual and interim filings take part in scoring; other forms never do.
    pub const fn is_periodic(&self) -> bool {
        matches!(self, Self::Annual | Self::Interim)
    }
}

/// A single reported value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Taxonomy concept name without prefix (e.g. "NetIncomeLoss")
    pub concept: String,

    /// Reported value
    pub value: f64,

    /// End date of the reporting period
    pub period_end: NaiveDate,

    /// Balance polarity of the concept, as tagged by the filer.
    ///
    /// Informational only: scoring never reads it. Working-capital signs come
    /// from the polarity of each group in the scoring configuration's
    /// working-capital table, which is authoritative.
    pub polarity: BalancePolarity,

    /// Frequency of the filing that carried the fact
    pub frequency: FilingFrequency,

    /// Date the carrying filing was accepted, when known. A later filing for
    /// the same period and concept supersedes an earlier one.
    pub filed: Option<NaiveDate>,
}

impl Fact {
    /// Create a fact with no polarity and no filing date.
    pub fn new(
        concept: impl Into<String>,
        value: f64,
        period_end: NaiveDate,
        frequency: FilingFrequency,
    ) -> Self {
        Self {
            concept: concept.into(),
            value,
            period_end,
            polarity: BalancePolarity::None,
            frequency,
            filed: None,
        }
    }

    /// Shorthand for an annual-filing fact.
    pub fn annual(concept: impl Into<String>, value: f64, period_end: NaiveDate) -> Self {
        Self::new(concept, value, period_end, FilingFrequency::Annual)
    }

    /// Shorthand for an interim-filing fact.
    pub fn interim(concept: impl Into<String>, value: f64, period_end: NaiveDate) -> Self {
        Self::new(concept, value, period_end, FilingFrequency::Interim)
    }

    /// Set the balance polarity.
    pub const fn with_polarity(mut self, polarity: BalancePolarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Set the filing date.
    pub const fn filed_on(mut self, filed: NaiveDate) -> Self {
        self.filed = Some(filed);
        self
    }

    /// Returns true if the fact came from an annual filing.
    pub fn is_annual(&self) -> bool {
        self.frequency == FilingFrequency::Annual
    }

    /// Reject values the engine cannot compute with.
    pub fn validate(&self) -> Result<()> {
        if self.value.is_finite() {
            Ok(())
        } else {
            Err(DataError::InvalidValue {
                concept: self.concept.clone(),
                value: self.value,
            })
        }
    }
}

/// All facts fetched for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFacts {
    /// Company identifier
    pub company_id: u64,
    /// Facts in retrieval order
    pub facts: Vec<Fact>,
}

impl CompanyFacts {
    /// Create a new per-company fact set.
    pub const fn new(company_id: u64, facts: Vec<Fact>) -> Self {
        Self { company_id, facts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FilingFrequency::Annual, true)]
    #[case(FilingFrequency::Interim, true)]
    #[case(FilingFrequency::Other, false)]
    fn test_periodic_frequencies(#[case] frequency: FilingFrequency, #[case] expected: bool) {
        assert_eq!(frequency.is_periodic(), expected);
    }

    #[test]
    fn test_db_representations_round_trip() {
        for polarity in [
            BalancePolarity::None,
            BalancePolarity::Credit,
            BalancePolarity::Debit,
            BalancePolarity::NotApplicable,
        ] {
            assert_eq!(
                BalancePolarity::from_db_id(polarity.to_db_id()).unwrap(),
                polarity
            );
        }
        assert!(BalancePolarity::from_db_id(9).is_err());
        assert!(FilingFrequency::from_db_str("X").is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert!(Fact::annual("Assets", 10.0, date).validate().is_ok());
        assert!(Fact::annual("Assets", f64::NAN, date).validate().is_err());
        assert!(
            Fact::annual("Assets", f64::INFINITY, date)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_builder_helpers() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let filed = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        let fact = Fact::interim("IncreaseDecreaseInInventories", -5.0, date)
            .with_polarity(BalancePolarity::Credit)
            .filed_on(filed);

        assert!(!fact.is_annual());
        assert_eq!(fact.polarity, BalancePolarity::Credit);
        assert_eq!(fact.filed, Some(filed));
    }
}
