use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder substituted with a title's external id in review URL templates
pub const ID_PLACEHOLDER: &str = "{id}";

/// Main configuration structure for Review-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub scraper: ScraperConfig,

    /// Headers sent with every outbound request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub selectors: SelectorConfig,

    pub output: OutputConfig,

    #[serde(default, rename = "listing")]
    pub listings: Vec<ListingSource>,
}

/// Scraper behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Maximum number of titles whose reviews are collected concurrently
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Per-request timeout applied by the HTTP client (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Favorable review page template, must contain `{id}`
    #[serde(rename = "favorable-review-url")]
    pub favorable_review_url: String,

    /// Unfavorable review page template, must contain `{id}`
    #[serde(rename = "unfavorable-review-url")]
    pub unfavorable_review_url: String,
}

fn default_request_timeout() -> u64 {
    30
}

/// CSS selectors used on review pages
///
/// `review-text` and `rating` are matched inside each review container, so a
/// review without a rating never borrows the rating of its neighbour.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Element wrapping one complete review; the N-th match is review N
    #[serde(rename = "review-container", default = "default_review_container_selector")]
    pub review_container: String,

    /// Free text of one review, inside its container
    #[serde(rename = "review-text", default = "default_review_text_selector")]
    pub review_text: String,

    /// Displayed rating of one review, inside its container
    #[serde(rename = "rating", default = "default_rating_selector")]
    pub rating: String,
}

fn default_review_container_selector() -> String {
    "div.review-container".to_string()
}

fn default_review_text_selector() -> String {
    "div.text.show-more__control".to_string()
}

fn default_rating_selector() -> String {
    "span.rating-other-user-rating span:first-of-type".to_string()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            review_container: default_review_container_selector(),
            review_text: default_review_text_selector(),
            rating: default_rating_selector(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Which end of a chart a listing page covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatedType {
    Top,
    Bottom,
}

/// Kind of titles a listing page enumerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    #[serde(alias = "tv", alias = "other")]
    Series,
}

impl fmt::Display for RatedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie => write!(f, "movie"),
            Self::Series => write!(f, "series"),
        }
    }
}

/// One listing page to scrape
#[derive(Debug, Clone, Deserialize)]
pub struct ListingSource {
    pub rated: RatedType,
    pub category: Category,
    pub url: String,
}

impl ListingSource {
    /// Key naming this listing in logs and stored rows (e.g. `top_movie`)
    pub fn key(&self) -> String {
        format!("{}_{}", self.rated, self.category)
    }
}
