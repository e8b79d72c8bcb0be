//! Harvest module for listing and review scraping
//!
//! This module contains the core scraping pipeline, including:
//! - HTTP fetching with a fixed header set
//! - HTML parsing and positional text lookups
//! - External id extraction from listing pages
//! - Per-title review collection
//! - Bounded parallel fan-out over titles
//! - Per-listing orchestration and persistence

mod fanout;
mod fetcher;
mod identifiers;
mod orchestrator;
mod parser;
mod reviews;

pub use fanout::{run_on_pool, run_parallel, FanOutReport, WorkerPool};
pub use fetcher::{build_http_client, Fetch, HttpFetcher};
pub use identifiers::{
    extract_identifiers, listing_selector, select_listing_nodes, BOTTOM_LISTING_SELECTOR,
    TOP_LISTING_SELECTOR,
};
pub use orchestrator::{load_identifiers, ListingRunner, ListingSummary, RunSummary};
pub use parser::{
    compile_selector, element_text, find_all, parse_document, text_at_path, text_within,
    PositionalPath,
};
pub use reviews::{extract_review_page, ReviewCollector, ReviewPage};

use std::fmt;

/// A title found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    pub title: String,
    pub external_id: String,
}

/// Review page bucket a review was scraped from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Favorable,
    Unfavorable,
}

impl Sentiment {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Favorable => "favorable",
            Self::Unfavorable => "unfavorable",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "favorable" => Some(Self::Favorable),
            "unfavorable" => Some(Self::Unfavorable),
            _ => None,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// One scraped user review
///
/// `rating` holds the rating text exactly as displayed; `None` means no rating
/// was shown in this review's container.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub title: String,
    pub sentiment: Sentiment,
    pub review_text: String,
    pub rating: Option<String>,
}
