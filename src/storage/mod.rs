//! Storage abstractions for record persistence.
//!
//! Each target owns one append-only store. Rows are never rewritten or
//! reordered; the first column is the record key.
//!
//! ## Directory Structure
//!
//! ```text
//! {data_dir}/
//! ├── last_run.json             # Report of the most recent run
//! └── tku_sprout_events.csv     # One store per target
//! ```

pub mod csv_store;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::Record;

// Re-export for convenience
pub use csv_store::CsvStore;

/// Trait for record store backends.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Keys of every stored record, oldest first.
    async fn load_keys(&self) -> Result<Vec<String>>;

    /// Append `records` after the existing ones.
    ///
    /// Either every record is persisted or none is.
    async fn append(&self, records: &[Record]) -> Result<usize>;

    /// Human-readable location for logs and reports.
    fn location(&self) -> String;
}

/// Summary of a store's contents.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub location: String,
    pub records: usize,
    /// Non-empty value count per column, in column order
    pub filled: Vec<(String, usize)>,
}
