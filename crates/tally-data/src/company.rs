//! Company identity and price records supplied by collaborators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A company in the scoring universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Internal company identifier
    pub company_id: u64,
    /// Central Index Key (SEC identifier)
    pub cik: String,
    /// Registrant name
    pub name: Option<String>,
    /// Primary ticker symbol
    pub ticker: Option<String>,
    /// Listing exchange
    pub exchange: Option<String>,
}

impl Company {
    /// Create a company with only its identifiers.
    pub fn new(company_id: u64, cik: impl Into<String>) -> Self {
        Self {
            company_id,
            cik: cik.into(),
            name: None,
            ticker: None,
            exchange: None,
        }
    }

    /// Set the registrant name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the primary ticker and exchange.
    pub fn with_listing(mut self, ticker: impl Into<String>, exchange: Option<String>) -> Self {
        self.ticker = Some(ticker.into());
        self.exchange = exchange;
        self
    }

    /// Ticker in the canonical (upper-case) form used for price lookups.
    pub fn price_key(&self) -> Option<String> {
        self.ticker.as_deref().map(normalize_ticker)
    }
}

/// Most recent closing price on or before some date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestPrice {
    /// Ticker symbol
    pub ticker: String,
    /// Closing price
    pub close: f64,
    /// Trading date of the close
    pub price_date: NaiveDate,
}

impl LatestPrice {
    /// Create a new price record.
    pub fn new(ticker: impl Into<String>, close: f64, price_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            close,
            price_date,
        }
    }
}

/// Canonical ticker form: trimmed and upper-cased.
pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_key_is_case_insensitive() {
        let company = Company::new(1, "0000320193").with_listing(" aapl ", None);
        assert_eq!(company.price_key().as_deref(), Some("AAPL"));
        assert_eq!(Company::new(2, "1").price_key(), None);
    }
}
