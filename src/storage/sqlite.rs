//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ReviewSink trait.

use crate::harvest::{ReviewRecord, Sentiment, TitleRecord};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ReviewSink, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, IDENTIFIERS_TABLE, REVIEWS_TABLE, RUNS_TABLE};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn expect_table(table: &str, expected: &str) -> StorageResult<()> {
    if table == expected {
        Ok(())
    } else {
        Err(StorageError::UnknownTable(table.to_string()))
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}

impl ReviewSink for SqliteStorage {
    // ===== Run Management =====

    fn begin_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    // ===== Rows =====

    fn store_rows(
        &mut self,
        table: &str,
        run_id: i64,
        listing: &str,
        rows: &[TitleRecord],
    ) -> StorageResult<usize> {
        expect_table(table, IDENTIFIERS_TABLE)?;

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO identifiers (run_id, listing, title, external_id) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(params![run_id, listing, row.title, row.external_id])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Stored {} identifier rows for {}", rows.len(), listing);
        Ok(rows.len())
    }

    fn store_nested_rows(
        &mut self,
        table: &str,
        run_id: i64,
        listing: &str,
        rows: &[Vec<ReviewRecord>],
    ) -> StorageResult<usize> {
        expect_table(table, REVIEWS_TABLE)?;

        let mut written = 0;
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO reviews (run_id, listing, title, sentiment, review, rating)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for review in rows.iter().flatten() {
                stmt.execute(params![
                    run_id,
                    listing,
                    review.title,
                    review.sentiment.to_db_string(),
                    review.review_text,
                    review.rating,
                ])?;
                written += 1;
            }
        }
        tx.commit()?;

        tracing::debug!("Stored {} review rows for {}", written, listing);
        Ok(written)
    }

    fn load_identifiers(&self, run_id: i64) -> StorageResult<Vec<TitleRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title, external_id FROM identifiers WHERE run_id = ?1 ORDER BY id")?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(TitleRecord {
                    title: row.get(0)?,
                    external_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn load_reviews(&self, run_id: i64) -> StorageResult<Vec<ReviewRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, sentiment, review, rating FROM reviews WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(ReviewRecord {
                    title: row.get(0)?,
                    sentiment: Sentiment::from_db_string(&row.get::<_, String>(1)?)
                        .unwrap_or(Sentiment::Favorable),
                    review_text: row.get(2)?,
                    rating: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ===== Statistics =====

    fn count_rows(&self, table: &str) -> StorageResult<u64> {
        if ![IDENTIFIERS_TABLE, REVIEWS_TABLE, RUNS_TABLE].contains(&table) {
            return Err(StorageError::UnknownTable(table.to_string()));
        }

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_unrated_reviews(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE rating IS NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_reviews_by_listing(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT listing, COUNT(*) FROM reviews GROUP BY listing ORDER BY listing")?;

        let rows = stmt
            .query_map([], |row| {
                let listing: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((listing, count as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
