//! Batch and single-company scoring.
//!
//! Both entry points run every company through [`score_company`]: window the
//! facts, partition them, compute the family's metrics and checks. Batch runs
//! differ only in how facts, prices and companies are fetched (three bulk
//! queries instead of three point lookups), so the two modes agree exactly on
//! every score.

use crate::cancel::CancelFlag;
use crate::error::{Result, ScoreError};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tally_data::{
    Company, CompanyDirectory, CompanyFacts, Fact, FactSource, LatestPrice, PriceSource,
    bound_to_window,
};
use tally_output::{CompanyMoatScoreSummary, CompanyScoreSummary};
use tally_scoring::{
    MoatScoringResult, PartitionedFacts, ScoringConfig, ScoringResult, partition,
};

/// One scorecard family, as seen by the orchestrator.
trait Family: Send + Sync + 'static {
    type Output: Send;
    type Summary: Send + 'static;

    const NAME: &'static str;

    fn window(config: &ScoringConfig) -> usize;
    fn concepts(config: &ScoringConfig) -> Vec<String>;
    fn score(
        partitioned: &PartitionedFacts,
        price: Option<&LatestPrice>,
        config: &ScoringConfig,
    ) -> Self::Output;
    fn years_of_data(output: &Self::Output) -> usize;
    fn summarize(company: &Company, output: &Self::Output, at: DateTime<Utc>) -> Self::Summary;
}

struct ValueFamily;

impl Family for ValueFamily {
    type Output = ScoringResult;
    type Summary = CompanyScoreSummary;

    const NAME: &'static str = "value";

    fn window(config: &ScoringConfig) -> usize {
        config.value_window_years
    }

    fn concepts(config: &ScoringConfig) -> Vec<String> {
        config.value_concept_names()
    }

    fn score(
        partitioned: &PartitionedFacts,
        price: Option<&LatestPrice>,
        config: &ScoringConfig,
    ) -> ScoringResult {
        ScoringResult::compute(partitioned, price, config)
    }

    fn years_of_data(output: &ScoringResult) -> usize {
        output.years_of_data
    }

    fn summarize(company: &Company, output: &ScoringResult, at: DateTime<Utc>) -> CompanyScoreSummary {
        CompanyScoreSummary::from_result(company, output, at)
    }
}

struct MoatFamily;

impl Family for MoatFamily {
    type Output = MoatScoringResult;
    type Summary = CompanyMoatScoreSummary;

    const NAME: &'static str = "moat";

    fn window(config: &ScoringConfig) -> usize {
        config.moat_window_years
    }

    fn concepts(config: &ScoringConfig) -> Vec<String> {
        config.moat_concept_names()
    }

    fn score(
        partitioned: &PartitionedFacts,
        price: Option<&LatestPrice>,
        config: &ScoringConfig,
    ) -> MoatScoringResult {
        MoatScoringResult::compute(partitioned, price, config)
    }

    fn years_of_data(output: &MoatScoringResult) -> usize {
        output.years_of_data
    }

    fn summarize(
        company: &Company,
        output: &MoatScoringResult,
        at: DateTime<Utc>,
    ) -> CompanyMoatScoreSummary {
        CompanyMoatScoreSummary::from_result(company, output, at)
    }
}

/// Score one company's facts. Shared by batch and single-company runs.
fn score_company<F: Family>(
    facts: Vec<Fact>,
    price: Option<&LatestPrice>,
    config: &ScoringConfig,
) -> F::Output {
    let facts = bound_to_window(facts, F::window(config));
    let partitioned = partition(&facts, config);
    F::score(&partitioned, price, config)
}

/// Orchestrates scoring runs against a collaborator.
#[derive(Debug)]
pub struct Scorer<S> {
    source: S,
    config: Arc<ScoringConfig>,
}

impl<S> Scorer<S>
where
    S: FactSource + PriceSource + CompanyDirectory,
{
    /// Create a scorer over `source`.
    pub fn new(source: S, config: ScoringConfig) -> Self {
        Self {
            source,
            config: Arc::new(config),
        }
    }

    /// The collaborator.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The scoring configuration.
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Value-score every company with annual data. Prices are the latest on
    /// or before `as_of`.
    pub async fn compute_all(
        &self,
        as_of: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<Vec<CompanyScoreSummary>> {
        self.run_batch::<ValueFamily>(as_of, cancel).await
    }

    /// Moat-score every company with annual data.
    pub async fn compute_all_moat(
        &self,
        as_of: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<Vec<CompanyMoatScoreSummary>> {
        self.run_batch::<MoatFamily>(as_of, cancel).await
    }

    /// Value-score one company.
    pub async fn compute_one(
        &self,
        company_id: u64,
        as_of: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<ScoringResult> {
        self.run_one::<ValueFamily>(company_id, as_of, cancel).await
    }

    /// Moat-score one company.
    pub async fn compute_one_moat(
        &self,
        company_id: u64,
        as_of: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<MoatScoringResult> {
        self.run_one::<MoatFamily>(company_id, as_of, cancel).await
    }

    /// Await an upstream call under the configured timeout.
    async fn fetch<T>(
        &self,
        what: &'static str,
        call: impl Future<Output = tally_data::Result<T>>,
    ) -> Result<T> {
        let limit = self.config.fetch_timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                tracing::warn!(what, ?limit, "Fetch timed out");
                Err(ScoreError::Timeout(limit))
            }
        }
    }

    async fn run_one<F: Family>(
        &self,
        company_id: u64,
        as_of: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<F::Output> {
        cancel.check()?;
        let config = &self.config;

        let company = self
            .fetch("company", self.source.company(company_id))
            .await?
            .ok_or(ScoreError::CompanyNotFound(company_id))?;

        let concepts = F::concepts(config);
        let facts = self
            .fetch(
                "facts",
                self.source
                    .fetch_company_facts(company_id, &concepts, F::window(config)),
            )
            .await?;

        let price = match company.price_key() {
            Some(ticker) => {
                self.fetch("price", self.source.latest_price(&ticker, as_of))
                    .await?
            }
            None => None,
        };

        cancel.check()?;
        tracing::debug!(
            company_id,
            family = F::NAME,
            facts = facts.len(),
            "Scoring company"
        );
        Ok(score_company::<F>(facts, price.as_ref(), config))
    }

    async fn run_batch<F: Family>(
        &self,
        as_of: NaiveDate,
        cancel: &CancelFlag,
    ) -> Result<Vec<F::Summary>> {
        cancel.check()?;
        let config = Arc::clone(&self.config);
        let concepts = F::concepts(&config);

        let facts = self
            .fetch(
                "facts",
                self.source.fetch_all_facts(&concepts, F::window(&config)),
            )
            .await?;
        let prices: HashMap<String, LatestPrice> = self
            .fetch("prices", self.source.latest_prices(as_of))
            .await?
            .into_iter()
            .map(|p| (p.ticker.clone(), p))
            .collect();
        let companies: HashMap<u64, Company> = self
            .fetch("companies", self.source.companies())
            .await?
            .into_iter()
            .map(|c| (c.company_id, c))
            .collect();

        tracing::info!(
            family = F::NAME,
            companies = facts.len(),
            facts = facts.iter().map(|c| c.facts.len()).sum::<usize>(),
            prices = prices.len(),
            "Fetched batch inputs"
        );

        let cancel = cancel.clone();
        let computed_at = Utc::now();
        let scored = tokio::task::spawn_blocking(move || {
            score_batch::<F>(facts, &prices, &companies, &config, &cancel, computed_at)
        })
        .await
        .map_err(|e| ScoreError::Worker(e.to_string()))??;

        tracing::info!(family = F::NAME, scored = scored.len(), "Batch complete");
        Ok(scored)
    }
}

/// Score every company on the rayon pool. Companies without annual data or
/// without a directory entry are left out.
fn score_batch<F: Family>(
    facts: Vec<CompanyFacts>,
    prices: &HashMap<String, LatestPrice>,
    companies: &HashMap<u64, Company>,
    config: &ScoringConfig,
    cancel: &CancelFlag,
    computed_at: DateTime<Utc>,
) -> Result<Vec<F::Summary>> {
    let total = facts.len();
    let step = (total / 10).max(1);
    let done = AtomicUsize::new(0);

    let scored: Vec<Option<F::Summary>> = facts
        .into_par_iter()
        .map(|company_facts| -> Result<Option<F::Summary>> {
            cancel.check()?;
            let company_id = company_facts.company_id;

            let summary = match companies.get(&company_id) {
                Some(company) => {
                    let price = company.price_key().and_then(|t| prices.get(&t));
                    let output = score_company::<F>(company_facts.facts, price, config);
                    if F::years_of_data(&output) == 0 {
                        tracing::debug!(company_id, "No annual data, excluded");
                        None
                    } else {
                        Some(F::summarize(company, &output, computed_at))
                    }
                }
                None => {
                    tracing::warn!(company_id, "Company missing from directory, skipped");
                    None
                }
            };

            let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
            if finished % step == 0 || finished == total {
                tracing::info!(
                    family = F::NAME,
                    "Scored {}/{} companies ({:.0}%)",
                    finished,
                    total,
                    100.0 * finished as f64 / total as f64
                );
            }
            Ok(summary)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(scored.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_data::FactStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_score_company_applies_window() {
        let config = ScoringConfig::default();
        let facts: Vec<Fact> = (2010..=2023)
            .map(|y| Fact::annual("NetIncomeLoss", 1.0, date(y, 12, 31)))
            .collect();

        let value = score_company::<ValueFamily>(facts.clone(), None, &config);
        assert_eq!(value.years_of_data, 5);

        let moat = score_company::<MoatFamily>(facts, None, &config);
        assert_eq!(moat.years_of_data, 8);
    }

    #[test]
    fn test_score_batch_excludes_companies_without_annual_data() {
        let config = ScoringConfig::default();
        let facts = vec![
            CompanyFacts::new(1, vec![Fact::annual("NetIncomeLoss", 1.0, date(2023, 12, 31))]),
            CompanyFacts::new(2, vec![Fact::interim("NetIncomeLoss", 1.0, date(2024, 3, 31))]),
            CompanyFacts::new(3, vec![Fact::annual("NetIncomeLoss", 1.0, date(2023, 12, 31))]),
        ];
        let companies: HashMap<u64, Company> = [1, 2]
            .into_iter()
            .map(|id| (id, Company::new(id, id.to_string())))
            .collect();

        let scored = score_batch::<ValueFamily>(
            facts,
            &HashMap::new(),
            &companies,
            &config,
            &CancelFlag::new(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].company_id, 1);
    }

    #[test]
    fn test_score_batch_honours_cancellation() {
        let config = ScoringConfig::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let facts = vec![CompanyFacts::new(1, Vec::new())];

        let result = score_batch::<MoatFamily>(
            facts,
            &HashMap::new(),
            &HashMap::new(),
            &config,
            &cancel,
            Utc::now(),
        );
        assert!(matches!(result, Err(ScoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_unknown_company() {
        let scorer = Scorer::new(FactStore::in_memory().unwrap(), ScoringConfig::default());
        let result = scorer
            .compute_one(42, date(2024, 1, 1), &CancelFlag::new())
            .await;
        assert!(matches!(result, Err(ScoreError::CompanyNotFound(42))));
    }
}
