//! Storage module for persisting scraped data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking
//! - Identifier and review row persistence
//! - Statistics queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{ReviewSink, StorageError, StorageResult};

use crate::HarvestError;
use std::path::Path;

/// Table receiving one row per listed title
pub const IDENTIFIERS_TABLE: &str = "identifiers";

/// Table receiving one row per scraped review
pub const REVIEWS_TABLE: &str = "reviews";

/// Table receiving one row per run
pub const RUNS_TABLE: &str = "runs";

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Represents a scrape run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a scrape run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    /// Every listing was stored
    Completed,
    /// Some listings were stored, others failed
    Partial,
    /// No listing was stored
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_roundtrip() {
        for status in &[
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Partial,
            RunStatus::Failed,
        ] {
            let db_str = status.to_db_string();
            let parsed = RunStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_run_status_invalid() {
        assert_eq!(RunStatus::from_db_string("invalid"), None);
    }
}
