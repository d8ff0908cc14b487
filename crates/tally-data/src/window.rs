//! Year-window bounding for a company's facts.

use crate::fact::Fact;
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Keep facts dated on one of the `annual_years` most recent annual period
/// ends, or on the single most recent annual/interim period end.
///
/// Facts from non-periodic filings are dropped. The function is idempotent,
/// so a source that already pre-filters and a caller that filters again agree.
pub fn bound_to_window(facts: Vec<Fact>, annual_years: usize) -> Vec<Fact> {
    let annual_dates: BTreeSet<NaiveDate> = facts
        .iter()
        .filter(|f| f.is_annual())
        .map(|f| f.period_end)
        .collect();
    let kept_annual: BTreeSet<NaiveDate> = annual_dates
        .iter()
        .rev()
        .take(annual_years)
        .copied()
        .collect();
    let latest = facts
        .iter()
        .filter(|f| f.frequency.is_periodic())
        .map(|f| f.period_end)
        .max();

    facts
        .into_iter()
        .filter(|f| f.frequency.is_periodic())
        .filter(|f| kept_annual.contains(&f.period_end) || Some(f.period_end) == latest)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::FilingFrequency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_keeps_most_recent_annual_dates() {
        let facts: Vec<Fact> = (2015..=2023)
            .map(|y| Fact::annual("NetIncomeLoss", y as f64, date(y, 12, 31)))
            .collect();

        let bounded = bound_to_window(facts, 5);
        let years: Vec<i32> = bounded
            .iter()
            .map(|f| chrono::Datelike::year(&f.period_end))
            .collect();
        assert_eq!(years, vec![2019, 2020, 2021, 2022, 2023]);
    }

    #[test]
    fn test_keeps_latest_interim_date_only() {
        let facts = vec![
            Fact::annual("Assets", 1.0, date(2022, 12, 31)),
            Fact::interim("Assets", 2.0, date(2022, 6, 30)),
            Fact::interim("Assets", 3.0, date(2023, 3, 31)),
            Fact::interim("Assets", 4.0, date(2023, 6, 30)),
        ];

        let bounded = bound_to_window(facts, 5);
        let values: Vec<f64> = bounded.iter().map(|f| f.value).collect();
        assert_eq!(values, vec![1.0, 4.0]);
    }

    #[test]
    fn test_drops_other_forms_and_is_idempotent() {
        let facts = vec![
            Fact::annual("Assets", 1.0, date(2021, 12, 31)),
            Fact::annual("Assets", 2.0, date(2022, 12, 31)),
            Fact::new("Assets", 9.0, date(2024, 1, 31), FilingFrequency::Other),
        ];

        let once = bound_to_window(facts, 1);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].value, 2.0);

        let twice = bound_to_window(once.clone(), 1);
        assert_eq!(once, twice);
    }
}
