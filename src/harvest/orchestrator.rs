//! Listing orchestration - main scrape loop
//!
//! This module drives a whole run:
//! - Recording the run in the sink
//! - Loading each listing page and extracting its titles
//! - Fanning out review collection over those titles
//! - Handing identifier and review rows to the sink
//! - Isolating failures so one broken listing does not stop the others

use crate::config::{Config, ListingSource, RatedType};
use crate::harvest::fanout::{run_on_pool, WorkerPool};
use crate::harvest::fetcher::Fetch;
use crate::harvest::identifiers::{extract_identifiers, select_listing_nodes};
use crate::harvest::parser::parse_document;
use crate::harvest::{ReviewCollector, TitleRecord};
use crate::storage::{ReviewSink, RunStatus, IDENTIFIERS_TABLE, REVIEWS_TABLE};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one successfully scraped listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSummary {
    /// Listing key (e.g. `top_movie`)
    pub listing: String,

    /// Number of titles extracted from the listing page
    pub identifiers: usize,

    /// Number of reviews stored across all titles
    pub reviews: usize,

    /// Titles whose review collection failed
    pub failed_titles: usize,
}

/// Outcome of a full run over every configured listing
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: i64,
    pub completed: Vec<ListingSummary>,

    /// Listing key and error message for each listing that failed
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    /// Final status to record for the run
    pub fn status(&self) -> RunStatus {
        match (self.completed.is_empty(), self.failed.is_empty()) {
            (_, true) => RunStatus::Completed,
            (true, false) => RunStatus::Failed,
            (false, false) => RunStatus::Partial,
        }
    }
}

/// Parses a listing page and extracts its titles
///
/// Kept synchronous so the parsed document never lives across an await point.
pub fn load_identifiers(html: &str, rated: RatedType) -> Result<Vec<TitleRecord>, HarvestError> {
    let doc = parse_document(html);
    let nodes = select_listing_nodes(&doc, rated)?;
    extract_identifiers(&nodes)
}

/// Runs listings one after another and persists their rows
pub struct ListingRunner<S: ReviewSink> {
    config: Config,
    fetcher: Arc<dyn Fetch>,
    collector: ReviewCollector,
    pool: WorkerPool,
    sink: S,
}

impl<S: ReviewSink> ListingRunner<S> {
    /// Creates a runner
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `fetcher` - Fetcher used for listing and review pages
    /// * `sink` - Destination for identifier and review rows
    pub fn new(config: Config, fetcher: Arc<dyn Fetch>, sink: S) -> Self {
        let collector = ReviewCollector::from_config(Arc::clone(&fetcher), &config);
        let pool = WorkerPool::new(config.scraper.max_workers as usize);
        Self {
            config,
            fetcher,
            collector,
            pool,
            sink,
        }
    }

    /// Handle to the worker pool shared by every listing of this runner
    ///
    /// Closing it fails titles still waiting for a slot, which aborts the
    /// fan-out in progress, and skips the remaining listings. The run is still
    /// finished with the matching status.
    pub fn pool(&self) -> WorkerPool {
        self.pool.clone()
    }

    /// Borrows the sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the runner, returning the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Scrapes every configured listing in order
    ///
    /// A failing listing is logged and recorded in the summary; the loop moves
    /// on to the next one. Only sink failures while opening or closing the run
    /// are returned as errors.
    pub async fn run_all(&mut self, config_hash: &str) -> Result<RunSummary, HarvestError> {
        let run_id = self.sink.begin_run(config_hash)?;
        let start_time = Instant::now();
        tracing::info!(
            "Starting run {} over {} listings",
            run_id,
            self.config.listings.len()
        );

        let mut summary = RunSummary {
            run_id,
            ..RunSummary::default()
        };

        let listings = self.config.listings.clone();
        for source in &listings {
            if self.pool.is_closed() {
                tracing::warn!("Worker pool closed, skipping listing {}", source.key());
                summary
                    .failed
                    .push((source.key(), "skipped: worker pool closed".to_string()));
                continue;
            }

            match self.run_listing(run_id, source).await {
                Ok(listing) => summary.completed.push(listing),
                Err(e) => {
                    tracing::error!("Listing {} failed: {}", source.key(), e);
                    summary.failed.push((source.key(), e.to_string()));
                }
            }
        }

        self.sink.finish_run(run_id, summary.status())?;

        tracing::info!(
            "Run {} finished in {:?}: {} listings stored, {} failed",
            run_id,
            start_time.elapsed(),
            summary.completed.len(),
            summary.failed.len()
        );

        Ok(summary)
    }

    /// Scrapes one listing and stores its rows under `run_id`
    ///
    /// # Steps
    ///
    /// 1. Fetch and parse the listing page
    /// 2. Select listing rows for the listing's tier
    /// 3. Extract titles and external ids
    /// 4. Collect reviews for all titles in parallel
    /// 5. Store identifier rows and grouped review rows
    pub async fn run_listing(
        &mut self,
        run_id: i64,
        source: &ListingSource,
    ) -> Result<ListingSummary, HarvestError> {
        let key = source.key();
        tracing::info!("Loading listing {} from {}", key, source.url);

        let body = self.fetcher.fetch(&source.url).await?;
        let identifiers = load_identifiers(&body, source.rated)?;
        tracing::info!("Listing {}: {} titles found", key, identifiers.len());

        let report = run_on_pool(&self.pool, &self.collector, &identifiers).await?;

        self.sink
            .store_rows(IDENTIFIERS_TABLE, run_id, &key, &identifiers)?;
        let reviews = self
            .sink
            .store_nested_rows(REVIEWS_TABLE, run_id, &key, &report.groups)?;

        tracing::info!("Finished scraping and stored {}", key);

        Ok(ListingSummary {
            listing: key,
            identifiers: identifiers.len(),
            reviews,
            failed_titles: report.failed,
        })
    }
}
