//! Collaborator seams.
//!
//! The scoring engine never talks to a database or an HTTP API directly; it
//! consumes these traits. [`crate::store::FactStore`] implements all three
//! against SQLite.

use crate::company::{Company, LatestPrice};
use crate::error::Result;
use crate::fact::{CompanyFacts, Fact};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Bulk and single-company fact retrieval.
///
/// Implementations should return only facts whose concept is in `concepts`,
/// already bounded to `annual_years` annual period ends plus the latest
/// periodic date (see [`crate::window::bound_to_window`]).
#[async_trait]
pub trait FactSource: Send + Sync {
    /// Fetch facts for every company in one query.
    async fn fetch_all_facts(
        &self,
        concepts: &[String],
        annual_years: usize,
    ) -> Result<Vec<CompanyFacts>>;

    /// Fetch facts for a single company.
    async fn fetch_company_facts(
        &self,
        company_id: u64,
        concepts: &[String],
        annual_years: usize,
    ) -> Result<Vec<Fact>>;
}

/// Most-recent price lookup.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest close on or before `as_of` for every ticker with prices.
    async fn latest_prices(&self, as_of: NaiveDate) -> Result<Vec<LatestPrice>>;

    /// Latest close on or before `as_of` for one ticker.
    async fn latest_price(&self, ticker: &str, as_of: NaiveDate) -> Result<Option<LatestPrice>>;
}

/// Company identity lookup.
#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Every company in the universe.
    async fn companies(&self) -> Result<Vec<Company>>;

    /// A single company, if known.
    async fn company(&self, company_id: u64) -> Result<Option<Company>>;
}
