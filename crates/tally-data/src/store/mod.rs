//! Persistent storage for companies, facts and prices.

pub mod sqlite;

pub use sqlite::{FactStore, StoreStats};
