//! Review-Harvest: a movie and series review scraper
//!
//! This crate loads title listings from a review-aggregation site, resolves each
//! listed title to its external id, and collects the favorable and unfavorable
//! user reviews for every title with a bounded worker pool before persisting
//! everything to SQLite.

pub mod config;
pub mod harvest;
pub mod storage;

use thiserror::Error;

/// Main error type for Review-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Extraction failed in {context}: {message}")]
    Extraction { context: String, message: String },

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Fan-out aborted: {0}")]
    FanOut(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

impl HarvestError {
    /// Returns true for failures caused by unexpected page markup or bad
    /// selectors, as opposed to transport or storage failures.
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction { .. } | Self::Selector(_))
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

/// Result type alias for Review-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{ListingRunner, ReviewCollector, ReviewRecord, TitleRecord};
pub use storage::{ReviewSink, SqliteStorage};
