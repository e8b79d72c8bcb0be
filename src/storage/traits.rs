//! Storage traits and error types
//!
//! This module defines the sink interface the scraper persists through and
//! the associated error types.

use crate::harvest::{ReviewRecord, TitleRecord};
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Unknown table for this operation: {0}")]
    UnknownTable(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Destination for scraped rows
///
/// Rows are always written under a run and tagged with the listing key that
/// produced them.
pub trait ReviewSink {
    // ===== Run Management =====

    /// Records the start of a run and returns its ID
    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Records the final status and finish time of a run
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    // ===== Rows =====

    /// Stores identifier rows into `table`
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn store_rows(
        &mut self,
        table: &str,
        run_id: i64,
        listing: &str,
        rows: &[TitleRecord],
    ) -> StorageResult<usize>;

    /// Stores review rows grouped per title into `table`, flattening the groups
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn store_nested_rows(
        &mut self,
        table: &str,
        run_id: i64,
        listing: &str,
        rows: &[Vec<ReviewRecord>],
    ) -> StorageResult<usize>;

    /// Loads the identifier rows of a run in insertion order
    fn load_identifiers(&self, run_id: i64) -> StorageResult<Vec<TitleRecord>>;

    /// Loads the review rows of a run in insertion order
    fn load_reviews(&self, run_id: i64) -> StorageResult<Vec<ReviewRecord>>;

    // ===== Statistics =====

    /// Counts all rows in `table`
    fn count_rows(&self, table: &str) -> StorageResult<u64>;

    /// Counts reviews stored without a rating
    fn count_unrated_reviews(&self) -> StorageResult<u64>;

    /// Gets review counts per listing key, sorted by listing
    fn count_reviews_by_listing(&self) -> StorageResult<Vec<(String, u64)>>;
}
