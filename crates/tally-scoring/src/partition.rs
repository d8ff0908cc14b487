//! Period partitioning.
//!
//! Splits a company's fact stream into the annual trend series, the latest
//! balance-sheet snapshot and the oldest retained-earnings figure.

use crate::config::ScoringConfig;
use crate::resolver::{Snapshot, resolve};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tally_data::Fact;

/// A company's facts after partitioning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionedFacts {
    /// Calendar year of period end to annual-filing values
    pub annual: BTreeMap<i32, Snapshot>,
    /// Most recent values regardless of filing frequency
    pub latest: Snapshot,
    /// Period end of the latest snapshot
    pub latest_date: Option<NaiveDate>,
    /// Retained earnings resolved on the earliest annual year
    pub oldest_retained_earnings: Option<f64>,
}

impl PartitionedFacts {
    /// Number of annual years available.
    pub fn years_of_data(&self) -> usize {
        self.annual.len()
    }

    /// The most recent annual year and its values.
    pub fn most_recent_year(&self) -> Option<(i32, &Snapshot)> {
        self.annual.last_key_value().map(|(y, s)| (*y, s))
    }
}

/// One value slot, remembering which filing supplied it.
#[derive(Debug, Clone, Copy)]
struct Reported {
    filed: Option<NaiveDate>,
    value: f64,
}

type ByDate = BTreeMap<NaiveDate, BTreeMap<String, Reported>>;

/// Record `fact` unless an already-seen fact for the same period and concept
/// was filed later. Unknown filing dates sort first; ties go to the later fact.
fn record(by_date: &mut ByDate, fact: &Fact) {
    let slot = by_date
        .entry(fact.period_end)
        .or_default()
        .entry(fact.concept.clone());
    let incoming = Reported {
        filed: fact.filed,
        value: fact.value,
    };

    match slot {
        Entry::Vacant(v) => {
            v.insert(incoming);
        }
        Entry::Occupied(mut o) => {
            if incoming.filed >= o.get().filed {
                o.insert(incoming);
            }
        }
    }
}

fn values(reported: &BTreeMap<String, Reported>) -> impl Iterator<Item = (String, f64)> + '_ {
    reported.iter().map(|(k, r)| (k.clone(), r.value))
}

/// Partition a company's facts.
///
/// Facts from non-periodic filings are ignored. Annual facts build one
/// snapshot per calendar year of period end; if two annual period ends fall
/// in the same calendar year the later one wins per concept. The latest
/// snapshot is the year's annual entry when the newest date is annual, or
/// that date's interim values when an interim filing is newer.
pub fn partition(facts: &[Fact], config: &ScoringConfig) -> PartitionedFacts {
    let mut annual_dates: ByDate = BTreeMap::new();
    let mut all_dates: ByDate = BTreeMap::new();

    for fact in facts.iter().filter(|f| f.frequency.is_periodic()) {
        record(&mut all_dates, fact);
        if fact.is_annual() {
            record(&mut annual_dates, fact);
        }
    }

    let mut annual: BTreeMap<i32, Snapshot> = BTreeMap::new();
    for (date, reported) in &annual_dates {
        annual.entry(date.year()).or_default().extend(values(reported));
    }

    let latest_date = all_dates.last_key_value().map(|(d, _)| *d);
    let latest = match latest_date {
        Some(date) if annual_dates.contains_key(&date) => {
            annual.get(&date.year()).cloned().unwrap_or_default()
        }
        Some(date) => all_dates
            .get(&date)
            .map(|reported| values(reported).collect())
            .unwrap_or_default(),
        None => Snapshot::new(),
    };

    let oldest_retained_earnings = annual
        .first_key_value()
        .and_then(|(_, snapshot)| resolve(snapshot, &config.chains.retained_earnings, None));

    tracing::trace!(
        facts = facts.len(),
        years = annual.len(),
        ?latest_date,
        "Partitioned facts"
    );

    PartitionedFacts {
        annual,
        latest,
        latest_date,
        oldest_retained_earnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_data::FilingFrequency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_annual_series_by_calendar_year() {
        let facts = vec![
            Fact::annual("Assets", 100.0, date(2021, 12, 31)),
            Fact::annual("Assets", 110.0, date(2022, 12, 31)),
            Fact::annual("Liabilities", 50.0, date(2022, 12, 31)),
        ];
        let p = partition(&facts, &ScoringConfig::default());

        assert_eq!(p.years_of_data(), 2);
        assert_eq!(p.annual[&2021]["Assets"], 100.0);
        assert_eq!(p.annual[&2022].len(), 2);
        assert_eq!(p.latest, p.annual[&2022]);
        assert_eq!(p.latest_date, Some(date(2022, 12, 31)));
    }

    #[test]
    fn test_newer_interim_feeds_snapshot_only() {
        let facts = vec![
            Fact::annual("Assets", 100.0, date(2022, 12, 31)),
            Fact::interim("Assets", 130.0, date(2023, 6, 30)),
            Fact::interim("Assets", 90.0, date(2022, 9, 30)),
        ];
        let p = partition(&facts, &ScoringConfig::default());

        assert_eq!(p.annual.len(), 1);
        assert_eq!(p.annual[&2022]["Assets"], 100.0);
        assert_eq!(p.latest["Assets"], 130.0);
    }

    #[test]
    fn test_older_interim_never_becomes_snapshot() {
        let facts = vec![
            Fact::interim("Assets", 90.0, date(2022, 9, 30)),
            Fact::annual("Assets", 100.0, date(2022, 12, 31)),
        ];
        let p = partition(&facts, &ScoringConfig::default());
        assert_eq!(p.latest["Assets"], 100.0);
    }

    #[test]
    fn test_restatement_later_filing_wins() {
        let period = date(2022, 12, 31);
        let facts = vec![
            Fact::annual("NetIncomeLoss", 10.0, period).filed_on(date(2024, 2, 1)),
            Fact::annual("NetIncomeLoss", 8.0, period).filed_on(date(2023, 2, 1)),
            Fact::annual("Revenues", 1.0, period),
            Fact::annual("Revenues", 2.0, period),
        ];
        let p = partition(&facts, &ScoringConfig::default());

        assert_eq!(p.annual[&2022]["NetIncomeLoss"], 10.0);
        assert_eq!(p.annual[&2022]["Revenues"], 2.0);
    }

    #[test]
    fn test_same_calendar_year_later_period_end_wins() {
        let facts = vec![
            Fact::annual("Assets", 100.0, date(2022, 1, 31)),
            Fact::annual("Goodwill", 5.0, date(2022, 1, 31)),
            Fact::annual("Assets", 120.0, date(2022, 12, 31)),
        ];
        let p = partition(&facts, &ScoringConfig::default());

        assert_eq!(p.years_of_data(), 1);
        assert_eq!(p.annual[&2022]["Assets"], 120.0);
        assert_eq!(p.annual[&2022]["Goodwill"], 5.0);
    }

    #[test]
    fn test_zero_annual_years() {
        let facts = vec![
            Fact::interim("StockholdersEquity", 500.0, date(2023, 3, 31)),
            Fact::new("Assets", 1.0, date(2024, 1, 1), FilingFrequency::Other),
        ];
        let p = partition(&facts, &ScoringConfig::default());

        assert_eq!(p.years_of_data(), 0);
        assert!(p.most_recent_year().is_none());
        assert_eq!(p.latest["StockholdersEquity"], 500.0);
        assert!(!p.latest.contains_key("Assets"));
        assert_eq!(p.oldest_retained_earnings, None);
    }

    #[test]
    fn test_oldest_retained_earnings_from_earliest_annual_year() {
        let facts = vec![
            Fact::interim("RetainedEarningsAccumulatedDeficit", 1.0, date(2019, 6, 30)),
            Fact::annual("RetainedEarningsAccumulatedDeficit", 10.0, date(2020, 12, 31)),
            Fact::annual("RetainedEarningsAccumulatedDeficit", 30.0, date(2021, 12, 31)),
        ];
        let p = partition(&facts, &ScoringConfig::default());
        assert_eq!(p.oldest_retained_earnings, Some(10.0));
    }
}
