//! SQLite-backed fact, price and company store.

use crate::company::{Company, LatestPrice, normalize_ticker};
use crate::error::{DataError, Result};
use crate::fact::{BalancePolarity, CompanyFacts, Fact, FilingFrequency};
use crate::source::{CompanyDirectory, FactSource, PriceSource};
use crate::window::bound_to_window;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite store implementing every collaborator trait the scorer needs.
#[derive(Debug)]
pub struct FactStore {
    conn: Mutex<Connection>,
}

/// Raw fact row before date and enum decoding.
type FactRow = (i64, String, f64, String, i64, String, Option<String>);

impl FactStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DataError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS companies (
                company_id INTEGER PRIMARY KEY,
                cik TEXT NOT NULL,
                name TEXT,
                ticker TEXT,
                exchange TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS facts (
                company_id INTEGER NOT NULL,
                concept TEXT NOT NULL,
                value REAL NOT NULL,
                period_end TEXT NOT NULL,
                polarity INTEGER NOT NULL DEFAULT 0,
                frequency TEXT NOT NULL,
                filed TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_facts_company_concept ON facts(company_id, concept)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS prices (
                ticker TEXT NOT NULL,
                date TEXT NOT NULL,
                close REAL NOT NULL,
                PRIMARY KEY (ticker, date)
            )",
            [],
        )?;

        Ok(())
    }

    /// Insert or replace company identities.
    pub fn insert_companies(&self, companies: &[Company]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for company in companies {
            tx.execute(
                "INSERT OR REPLACE INTO companies (company_id, cik, name, ticker, exchange)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    company.company_id as i64,
                    company.cik,
                    company.name,
                    company.ticker,
                    company.exchange
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Append facts for one company.
    ///
    /// Rejects the whole batch if any value is NaN or infinite.
    pub fn insert_facts(&self, company_id: u64, facts: &[Fact]) -> Result<()> {
        for fact in facts {
            fact.validate()?;
        }

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for fact in facts {
            tx.execute(
                "INSERT INTO facts (company_id, concept, value, period_end, polarity, frequency, filed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    company_id as i64,
                    fact.concept,
                    fact.value,
                    fact.period_end.format(DATE_FORMAT).to_string(),
                    fact.polarity.to_db_id(),
                    fact.frequency.to_db_str(),
                    fact.filed.map(|d| d.format(DATE_FORMAT).to_string()),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Insert or replace closing prices. Tickers are stored upper-cased.
    pub fn insert_prices(&self, prices: &[LatestPrice]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        for price in prices {
            tx.execute(
                "INSERT OR REPLACE INTO prices (ticker, date, close) VALUES (?1, ?2, ?3)",
                params![
                    normalize_ticker(&price.ticker),
                    price.price_date.format(DATE_FORMAT).to_string(),
                    price.close
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Load facts for the given concepts, optionally for a single company,
    /// grouped by company in ascending id order.
    pub fn load_facts(
        &self,
        company_id: Option<u64>,
        concepts: &[String],
    ) -> Result<BTreeMap<u64, Vec<Fact>>> {
        let mut grouped: BTreeMap<u64, Vec<Fact>> = BTreeMap::new();
        if concepts.is_empty() {
            return Ok(grouped);
        }

        let placeholders = vec!["?"; concepts.len()].join(", ");
        let mut sql = format!(
            "SELECT company_id, concept, value, period_end, polarity, frequency, filed
             FROM facts WHERE concept IN ({placeholders})"
        );
        let mut values: Vec<Value> = concepts.iter().map(|c| Value::Text(c.clone())).collect();
        if let Some(id) = company_id {
            sql.push_str(" AND company_id = ?");
            values.push(Value::Integer(id as i64));
        }
        sql.push_str(" ORDER BY company_id, period_end, rowid");

        let rows: Vec<FactRow> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map(params_from_iter(values), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
        };

        for (id, concept, value, period_end, polarity, frequency, filed) in rows {
            let fact = Fact {
                concept,
                value,
                period_end: parse_date(&period_end)?,
                polarity: BalancePolarity::from_db_id(polarity)?,
                frequency: FilingFrequency::from_db_str(&frequency)?,
                filed: filed.as_deref().map(parse_date).transpose()?,
            };
            grouped.entry(id as u64).or_default().push(fact);
        }

        Ok(grouped)
    }

    /// Latest close on or before `as_of` for every ticker.
    pub fn load_latest_prices(&self, as_of: NaiveDate) -> Result<Vec<LatestPrice>> {
        let rows: Vec<(String, String, f64)> = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT p.ticker, p.date, p.close FROM prices p
                 JOIN (SELECT ticker, MAX(date) AS date FROM prices WHERE date <= ?1 GROUP BY ticker) m
                   ON p.ticker = m.ticker AND p.date = m.date
                 ORDER BY p.ticker",
            )?;
            stmt.query_map(params![as_of.format(DATE_FORMAT).to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
        };

        rows.into_iter()
            .map(|(ticker, date, close)| {
                Ok::<_, DataError>(LatestPrice::new(ticker, close, parse_date(&date)?))
            })
            .collect()
    }

    /// Latest close on or before `as_of` for one ticker.
    pub fn load_latest_price(&self, ticker: &str, as_of: NaiveDate) -> Result<Option<LatestPrice>> {
        let ticker = normalize_ticker(ticker);
        let row: Option<(String, f64)> = {
            let conn = self.lock()?;
            conn.query_row(
                "SELECT date, close FROM prices WHERE ticker = ?1 AND date <= ?2
                 ORDER BY date DESC LIMIT 1",
                params![ticker, as_of.format(DATE_FORMAT).to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
        };

        row.map(|(date, close)| {
            Ok::<_, DataError>(LatestPrice::new(ticker.clone(), close, parse_date(&date)?))
        })
            .transpose()
    }

    /// All companies ordered by id.
    pub fn load_companies(&self) -> Result<Vec<Company>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT company_id, cik, name, ticker, exchange FROM companies ORDER BY company_id",
        )?;
        let companies = stmt
            .query_map([], company_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(companies)
    }

    /// One company by id.
    pub fn load_company(&self, company_id: u64) -> Result<Option<Company>> {
        let conn = self.lock()?;
        let company = conn
            .query_row(
                "SELECT company_id, cik, name, ticker, exchange FROM companies WHERE company_id = ?1",
                params![company_id as i64],
                company_from_row,
            )
            .optional()?;
        Ok(company)
    }

    /// Remove every fact, price and company.
    pub fn clear_all(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM facts", [])?;
        conn.execute("DELETE FROM prices", [])?;
        conn.execute("DELETE FROM companies", [])?;
        Ok(())
    }

    /// Get store statistics.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.lock()?;

        let companies: i64 = conn.query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
        let facts: i64 = conn.query_row("SELECT COUNT(*) FROM facts", [], |row| row.get(0))?;
        let concepts: i64 =
            conn.query_row("SELECT COUNT(DISTINCT concept) FROM facts", [], |row| {
                row.get(0)
            })?;
        let prices: i64 = conn.query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))?;

        Ok(StoreStats {
            companies: companies as usize,
            facts: facts as usize,
            distinct_concepts: concepts as usize,
            prices: prices as usize,
        })
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of companies
    pub companies: usize,
    /// Number of fact rows
    pub facts: usize,
    /// Number of distinct concept names
    pub distinct_concepts: usize,
    /// Number of price rows
    pub prices: usize,
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DataError::Parse(format!("Invalid date '{}': {}", s, e)))
}

fn company_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        company_id: row.get::<_, i64>(0)? as u64,
        cik: row.get(1)?,
        name: row.get(2)?,
        ticker: row.get(3)?,
        exchange: row.get(4)?,
    })
}

#[async_trait]
impl FactSource for FactStore {
    async fn fetch_all_facts(
        &self,
        concepts: &[String],
        annual_years: usize,
    ) -> Result<Vec<CompanyFacts>> {
        let grouped = self.load_facts(None, concepts)?;
        tracing::debug!(companies = grouped.len(), "Loaded facts from store");

        Ok(grouped
            .into_iter()
            .map(|(id, facts)| CompanyFacts::new(id, bound_to_window(facts, annual_years)))
            .filter(|cf| !cf.facts.is_empty())
            .collect())
    }

    async fn fetch_company_facts(
        &self,
        company_id: u64,
        concepts: &[String],
        annual_years: usize,
    ) -> Result<Vec<Fact>> {
        let facts = self
            .load_facts(Some(company_id), concepts)?
            .remove(&company_id)
            .unwrap_or_default();
        Ok(bound_to_window(facts, annual_years))
    }
}

#[async_trait]
impl PriceSource for FactStore {
    async fn latest_prices(&self, as_of: NaiveDate) -> Result<Vec<LatestPrice>> {
        self.load_latest_prices(as_of)
    }

    async fn latest_price(&self, ticker: &str, as_of: NaiveDate) -> Result<Option<LatestPrice>> {
        self.load_latest_price(ticker, as_of)
    }
}

#[async_trait]
impl CompanyDirectory for FactStore {
    async fn companies(&self) -> Result<Vec<Company>> {
        self.load_companies()
    }

    async fn company(&self, company_id: u64) -> Result<Option<Company>> {
        self.load_company(company_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_store_initialization() {
        let store = FactStore::in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_store_stats_empty() {
        let store = FactStore::in_memory().unwrap();
        let stats = store.get_stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                companies: 0,
                facts: 0,
                distinct_concepts: 0,
                prices: 0
            }
        );
    }

    #[test]
    fn test_insert_facts_rejects_nan() {
        let store = FactStore::in_memory().unwrap();
        let facts = vec![
            Fact::annual("Assets", 1.0, date(2023, 12, 31)),
            Fact::annual("Liabilities", f64::NAN, date(2023, 12, 31)),
        ];

        let result = store.insert_facts(1, &facts);
        assert!(matches!(result, Err(DataError::InvalidValue { .. })));
        assert_eq!(store.get_stats().unwrap().facts, 0);
    }

    #[test]
    fn test_load_facts_filters_concepts() {
        let store = FactStore::in_memory().unwrap();
        let filed = date(2024, 2, 1);
        store
            .insert_facts(
                7,
                &[
                    Fact::annual("Assets", 100.0, date(2023, 12, 31))
                        .with_polarity(BalancePolarity::Debit)
                        .filed_on(filed),
                    Fact::annual("Goodwill", 5.0, date(2023, 12, 31)),
                ],
            )
            .unwrap();

        let grouped = store.load_facts(None, &["Assets".to_string()]).unwrap();
        let facts = &grouped[&7];
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].polarity, BalancePolarity::Debit);
        assert_eq!(facts[0].filed, Some(filed));

        assert!(store.load_facts(None, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_latest_price_on_or_before() {
        let store = FactStore::in_memory().unwrap();
        store
            .insert_prices(&[
                LatestPrice::new("abc", 10.0, date(2024, 1, 2)),
                LatestPrice::new("ABC", 11.0, date(2024, 1, 3)),
                LatestPrice::new("ABC", 12.0, date(2024, 1, 4)),
            ])
            .unwrap();

        let price = store
            .load_latest_price("abc", date(2024, 1, 3))
            .unwrap()
            .unwrap();
        assert_eq!(price.close, 11.0);
        assert_eq!(price.ticker, "ABC");

        assert!(
            store
                .load_latest_price("ABC", date(2023, 12, 31))
                .unwrap()
                .is_none()
        );

        let all = store.load_latest_prices(date(2024, 12, 31)).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].close, 12.0);
    }
}
