//! SQLite summary sink.
//!
//! Each run replaces a family's summary table inside one transaction: every
//! existing row is deleted and the new rows inserted. A failed run rolls back
//! and leaves the previous run's rows untouched.

use crate::export::ExportError;
use crate::summary::{CompanyMoatScoreSummary, CompanyScoreSummary};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

type Result<T> = std::result::Result<T, ExportError>;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Writer and reader for the persisted summary tables.
#[derive(Debug)]
pub struct SummaryWriter {
    conn: Mutex<Connection>,
}

impl SummaryWriter {
    /// Open or create the summary database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let writer = Self {
            conn: Mutex::new(conn),
        };
        writer.initialize_schema()?;
        Ok(writer)
    }

    /// Create an in-memory summary database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let writer = Self {
            conn: Mutex::new(conn),
        };
        writer.initialize_schema()?;
        Ok(writer)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| ExportError::LockPoisoned)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS company_scores (
                company_id INTEGER PRIMARY KEY,
                cik TEXT NOT NULL,
                company_name TEXT,
                ticker TEXT,
                exchange TEXT,
                overall_score INTEGER NOT NULL,
                computable_checks INTEGER NOT NULL,
                years_of_data INTEGER NOT NULL,
                book_value REAL,
                market_cap REAL,
                debt_to_equity_ratio REAL,
                price_to_book_ratio REAL,
                debt_to_book_ratio REAL,
                adjusted_retained_earnings REAL,
                average_net_cash_flow REAL,
                average_owner_earnings REAL,
                estimated_return_cf REAL,
                estimated_return_oe REAL,
                price_per_share REAL,
                price_date TEXT,
                shares_outstanding INTEGER,
                current_dividends_paid REAL,
                max_buy_price REAL,
                percentage_upside REAL,
                computed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS company_moat_scores (
                company_id INTEGER PRIMARY KEY,
                cik TEXT NOT NULL,
                company_name TEXT,
                ticker TEXT,
                exchange TEXT,
                overall_score INTEGER NOT NULL,
                computable_checks INTEGER NOT NULL,
                years_of_data INTEGER NOT NULL,
                average_gross_margin REAL,
                average_operating_margin REAL,
                average_roe_cf REAL,
                average_roe_oe REAL,
                estimated_return_oe REAL,
                revenue_cagr REAL,
                capex_ratio REAL,
                interest_coverage REAL,
                debt_to_equity_ratio REAL,
                price_per_share REAL,
                price_date TEXT,
                shares_outstanding INTEGER,
                computed_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Replace every value summary row with `rows`.
    pub fn replace_scores(&self, rows: &[CompanyScoreSummary]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM company_scores", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO company_scores VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                  ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.company_id as i64,
                    row.cik,
                    row.company_name,
                    row.ticker,
                    row.exchange,
                    row.overall_score as i64,
                    row.computable_checks as i64,
                    row.years_of_data as i64,
                    row.book_value,
                    row.market_cap,
                    row.debt_to_equity_ratio,
                    row.price_to_book_ratio,
                    row.debt_to_book_ratio,
                    row.adjusted_retained_earnings,
                    row.average_net_cash_flow,
                    row.average_owner_earnings,
                    row.estimated_return_cf,
                    row.estimated_return_oe,
                    row.price_per_share,
                    date_text(row.price_date),
                    row.shares_outstanding,
                    row.current_dividends_paid,
                    row.max_buy_price,
                    row.percentage_upside,
                    row.computed_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(rows = rows.len(), "Replaced company_scores");
        Ok(rows.len())
    }

    /// Replace every moat summary row with `rows`.
    pub fn replace_moat_scores(&self, rows: &[CompanyMoatScoreSummary]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM company_moat_scores", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO company_moat_scores VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                  ?18, ?19, ?20, ?21)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.company_id as i64,
                    row.cik,
                    row.company_name,
                    row.ticker,
                    row.exchange,
                    row.overall_score as i64,
                    row.computable_checks as i64,
                    row.years_of_data as i64,
                    row.average_gross_margin,
                    row.average_operating_margin,
                    row.average_roe_cf,
                    row.average_roe_oe,
                    row.estimated_return_oe,
                    row.revenue_cagr,
                    row.capex_ratio,
                    row.interest_coverage,
                    row.debt_to_equity_ratio,
                    row.price_per_share,
                    date_text(row.price_date),
                    row.shares_outstanding,
                    row.computed_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(rows = rows.len(), "Replaced company_moat_scores");
        Ok(rows.len())
    }

    /// All persisted value summaries ordered by company id.
    pub fn load_scores(&self) -> Result<Vec<CompanyScoreSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM company_scores ORDER BY company_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CompanyScoreSummary {
                    company_id: row.get::<_, i64>(0)? as u64,
                    cik: row.get(1)?,
                    company_name: row.get(2)?,
                    ticker: row.get(3)?,
                    exchange: row.get(4)?,
                    overall_score: row.get::<_, i64>(5)? as usize,
                    computable_checks: row.get::<_, i64>(6)? as usize,
                    years_of_data: row.get::<_, i64>(7)? as usize,
                    book_value: row.get(8)?,
                    market_cap: row.get(9)?,
                    debt_to_equity_ratio: row.get(10)?,
                    price_to_book_ratio: row.get(11)?,
                    debt_to_book_ratio: row.get(12)?,
                    adjusted_retained_earnings: row.get(13)?,
                    average_net_cash_flow: row.get(14)?,
                    average_owner_earnings: row.get(15)?,
                    estimated_return_cf: row.get(16)?,
                    estimated_return_oe: row.get(17)?,
                    price_per_share: row.get(18)?,
                    price_date: date_column(row, 19)?,
                    shares_outstanding: row.get(20)?,
                    current_dividends_paid: row.get(21)?,
                    max_buy_price: row.get(22)?,
                    percentage_upside: row.get(23)?,
                    computed_at: timestamp_column(row, 24)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All persisted moat summaries ordered by company id.
    pub fn load_moat_scores(&self) -> Result<Vec<CompanyMoatScoreSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT * FROM company_moat_scores ORDER BY company_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CompanyMoatScoreSummary {
                    company_id: row.get::<_, i64>(0)? as u64,
                    cik: row.get(1)?,
                    company_name: row.get(2)?,
                    ticker: row.get(3)?,
                    exchange: row.get(4)?,
                    overall_score: row.get::<_, i64>(5)? as usize,
                    computable_checks: row.get::<_, i64>(6)? as usize,
                    years_of_data: row.get::<_, i64>(7)? as usize,
                    average_gross_margin: row.get(8)?,
                    average_operating_margin: row.get(9)?,
                    average_roe_cf: row.get(10)?,
                    average_roe_oe: row.get(11)?,
                    estimated_return_oe: row.get(12)?,
                    revenue_cagr: row.get(13)?,
                    capex_ratio: row.get(14)?,
                    interest_coverage: row.get(15)?,
                    debt_to_equity_ratio: row.get(16)?,
                    price_per_share: row.get(17)?,
                    price_date: date_column(row, 18)?,
                    shares_outstanding: row.get(19)?,
                    computed_at: timestamp_column(row, 20)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|s| {
        NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_data::{Company, Fact, LatestPrice};
    use tally_scoring::{MoatScoringResult, ScoringConfig, ScoringResult, partition};

    fn value_row(id: u64) -> CompanyScoreSummary {
        let config = ScoringConfig::default();
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let facts = vec![
            Fact::annual("StockholdersEquity", 900.0, end),
            Fact::annual("CommonStockSharesOutstanding", 10.0, end),
        ];
        let price = LatestPrice::new("ACME", 50.0, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        let result = ScoringResult::compute(&partition(&facts, &config), Some(&price), &config);
        let company = Company::new(id, format!("{:010}", id)).with_listing("ACME", None);
        CompanyScoreSummary::from_result(&company, &result, Utc::now())
    }

    #[test]
    fn test_replace_and_load_scores() {
        let writer = SummaryWriter::in_memory().unwrap();
        let rows = vec![value_row(2), value_row(1)];

        assert_eq!(writer.replace_scores(&rows).unwrap(), 2);
        let loaded = writer.load_scores().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].company_id, 1);
        assert_eq!(loaded[0].book_value, Some(900.0));
        assert_eq!(loaded[0].shares_outstanding, Some(10));
        assert_eq!(loaded[0].price_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(loaded[0].computed_at.timestamp(), rows[1].computed_at.timestamp());
    }

    #[test]
    fn test_replace_drops_previous_run() {
        let writer = SummaryWriter::in_memory().unwrap();
        writer.replace_scores(&[value_row(1), value_row(2)]).unwrap();
        writer.replace_scores(&[value_row(3)]).unwrap();

        let ids: Vec<u64> = writer
            .load_scores()
            .unwrap()
            .iter()
            .map(|r| r.company_id)
            .collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn test_failed_replace_keeps_previous_run() {
        let writer = SummaryWriter::in_memory().unwrap();
        writer.replace_scores(&[value_row(1)]).unwrap();

        // Duplicate primary keys abort the transaction.
        assert!(writer.replace_scores(&[value_row(5), value_row(5)]).is_err());

        let loaded = writer.load_scores().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].company_id, 1);
    }

    #[test]
    fn test_moat_round_trip() {
        let writer = SummaryWriter::in_memory().unwrap();
        let config = ScoringConfig::default();
        let result = MoatScoringResult::compute(&partition(&[], &config), None, &config);
        let row = CompanyMoatScoreSummary::from_result(&Company::new(4, "4"), &result, Utc::now());

        writer.replace_moat_scores(std::slice::from_ref(&row)).unwrap();
        let loaded = writer.load_moat_scores().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].cik, "4");
        assert_eq!(loaded[0].overall_score, row.overall_score);
        assert!(writer.load_scores().unwrap().is_empty());
    }
}
