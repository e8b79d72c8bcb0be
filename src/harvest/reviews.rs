//! Review collection for a single title
//!
//! For one external id the collector loads the favorable and the unfavorable
//! review page, reads the text and rating of every review container on each
//! page, and flattens both into [`ReviewRecord`]s.

use crate::config::{Config, ScraperConfig, SelectorConfig, ID_PLACEHOLDER};
use crate::harvest::fetcher::Fetch;
use crate::harvest::parser::{parse_document, text_at_path, PositionalPath};
use crate::harvest::{ReviewRecord, Sentiment, TitleRecord};
use crate::HarvestError;
use std::sync::Arc;

/// Review texts and their ratings extracted from one review page
///
/// `ratings` always has exactly one entry per text; `None` marks a review
/// whose container shows no rating.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPage {
    pub texts: Vec<String>,
    pub ratings: Vec<Option<String>>,
}

impl ReviewPage {
    /// Number of ratings that were actually found
    pub fn rated_count(&self) -> usize {
        self.ratings.iter().filter(|r| r.is_some()).count()
    }

    fn into_records(
        self,
        title: &str,
        sentiment: Sentiment,
    ) -> impl Iterator<Item = ReviewRecord> + '_ {
        self.texts
            .into_iter()
            .zip(self.ratings)
            .map(move |(review_text, rating)| ReviewRecord {
                title: title.to_string(),
                sentiment,
                review_text,
                rating,
            })
    }
}

/// Extracts review texts and ratings from one review page
///
/// Review N is the N-th review container. Its text and its rating are both
/// looked up inside that container, so the two lists always have equal length
/// and a review without a rating gets `None` rather than a neighbour's score.
///
/// # Returns
///
/// * `Ok(ReviewPage)` - Possibly empty page contents
/// * `Err(HarvestError::Selector)` - A configured selector is invalid
/// * `Err(HarvestError::Extraction)` - A review container holds no review text
pub fn extract_review_page(
    html: &str,
    selectors: &SelectorConfig,
) -> Result<ReviewPage, HarvestError> {
    let doc = parse_document(html);
    let text_path = PositionalPath::new(&selectors.review_container, &selectors.review_text)?;
    let rating_path = PositionalPath::new(&selectors.review_container, &selectors.rating)?;

    let count = text_path.count(&doc);
    let mut page = ReviewPage {
        texts: Vec::with_capacity(count),
        ratings: Vec::with_capacity(count),
    };

    for index in 0..count {
        let text =
            text_at_path(&doc, &text_path, index).ok_or_else(|| HarvestError::Extraction {
                context: "review page".to_string(),
                message: format!(
                    "review container {} has no '{}' text",
                    index, selectors.review_text
                ),
            })?;
        page.texts.push(text);
        page.ratings.push(text_at_path(&doc, &rating_path, index));
    }

    Ok(page)
}

/// Collects favorable and unfavorable reviews for titles
#[derive(Clone)]
pub struct ReviewCollector {
    fetcher: Arc<dyn Fetch>,
    favorable_template: String,
    unfavorable_template: String,
    selectors: SelectorConfig,
}

impl ReviewCollector {
    /// Creates a collector using the review URL templates in `scraper`
    pub fn new(
        fetcher: Arc<dyn Fetch>,
        scraper: &ScraperConfig,
        selectors: SelectorConfig,
    ) -> Self {
        Self {
            fetcher,
            favorable_template: scraper.favorable_review_url.clone(),
            unfavorable_template: scraper.unfavorable_review_url.clone(),
            selectors,
        }
    }

    /// Creates a collector from a full configuration
    pub fn from_config(fetcher: Arc<dyn Fetch>, config: &Config) -> Self {
        Self::new(fetcher, &config.scraper, config.selectors.clone())
    }

    /// Builds the review page URL for one sentiment bucket
    pub fn review_url(&self, sentiment: Sentiment, external_id: &str) -> String {
        let template = match sentiment {
            Sentiment::Favorable => &self.favorable_template,
            Sentiment::Unfavorable => &self.unfavorable_template,
        };
        template.replace(ID_PLACEHOLDER, external_id)
    }

    /// Collects all reviews for one title
    ///
    /// Favorable records come before unfavorable ones. Extraction failures are
    /// logged and end collection early with whatever was gathered so far.
    /// Transport failures are returned to the caller.
    pub async fn collect_reviews(
        &self,
        title: &TitleRecord,
    ) -> Result<Vec<ReviewRecord>, HarvestError> {
        let mut reviews = Vec::new();

        for sentiment in [Sentiment::Favorable, Sentiment::Unfavorable] {
            let url = self.review_url(sentiment, &title.external_id);
            let body = self.fetcher.fetch(&url).await?;

            let page = match extract_review_page(&body, &self.selectors) {
                Ok(page) => page,
                Err(e) if e.is_extraction() => {
                    tracing::error!(
                        "Extraction failed collecting {} reviews for '{}' ({}): {:?}",
                        sentiment,
                        title.title,
                        title.external_id,
                        e
                    );
                    return Ok(reviews);
                }
                Err(e) => return Err(e),
            };

            tracing::info!(
                "Title - {} | {} reviews: {} | {} ratings: {}",
                title.title,
                sentiment,
                page.texts.len(),
                sentiment,
                page.rated_count()
            );

            reviews.extend(page.into_records(&title.title, sentiment));
        }

        Ok(reviews)
    }
}
