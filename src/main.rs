//! Review-Harvest main entry point
//!
//! This is the command-line interface for the Review-Harvest scraper.

use anyhow::Context;
use clap::Parser;
use review_harvest::config::{load_config_with_hash, Config};
use review_harvest::harvest::{Fetch, HttpFetcher, ListingRunner};
use review_harvest::storage::{
    open_storage, ReviewSink, IDENTIFIERS_TABLE, REVIEWS_TABLE, RUNS_TABLE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Review-Harvest: a movie and series review scraper
///
/// Review-Harvest loads the configured chart listings, collects favorable and
/// unfavorable user reviews for every listed title, and stores them in SQLite.
#[derive(Parser, Debug)]
#[command(name = "review-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A movie and series review scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be scraped without scraping
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_scrape(config, &config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvest=info,warn"),
            1 => EnvFilter::new("review_harvest=debug,info"),
            2 => EnvFilter::new("review_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows what would be scraped
fn handle_dry_run(config: &Config) {
    println!("=== Review-Harvest Dry Run ===\n");

    println!("Scraper Configuration:");
    println!("  Max workers: {}", config.scraper.max_workers);
    println!("  Request timeout: {}s", config.scraper.request_timeout_secs);
    println!("  Favorable reviews: {}", config.scraper.favorable_review_url);
    println!("  Unfavorable reviews: {}", config.scraper.unfavorable_review_url);

    println!("\nHeaders ({}):", config.headers.len());
    for (name, value) in &config.headers {
        println!("  {}: {}", name, value);
    }

    println!("\nSelectors:");
    println!("  Review container: {}", config.selectors.review_container);
    println!("  Review text: {}", config.selectors.review_text);
    println!("  Rating: {}", config.selectors.rating);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    println!("\nListings ({}):", config.listings.len());
    for listing in &config.listings {
        println!("  - {} -> {}", listing.key(), listing.url);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))?;

    println!("Runs: {}", storage.count_rows(RUNS_TABLE)?);
    if let Some(run) = storage.get_latest_run()? {
        println!(
            "  Latest: #{} {} (started {}, finished {})",
            run.id,
            run.status.to_db_string(),
            run.started_at,
            run.finished_at.as_deref().unwrap_or("-")
        );
    }
    println!("Identifiers: {}", storage.count_rows(IDENTIFIERS_TABLE)?);
    println!("Reviews: {}", storage.count_rows(REVIEWS_TABLE)?);
    println!("  Without rating: {}", storage.count_unrated_reviews()?);

    for (listing, count) in storage.count_reviews_by_listing()? {
        println!("  {}: {}", listing, count);
    }

    Ok(())
}

/// Handles the main scrape operation
async fn handle_scrape(config: Config, config_hash: &str) -> anyhow::Result<()> {
    tracing::info!(
        "Listings: {}, max workers: {}",
        config.listings.len(),
        config.scraper.max_workers
    );

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::from_config(&config)?);

    let mut runner = ListingRunner::new(config, fetcher, storage);

    // Ctrl-C closes the worker pool; the run is still finished and recorded
    let pool = runner.pool();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, aborting remaining titles");
            pool.close();
        }
    });

    let summary = runner.run_all(config_hash).await?;

    for listing in &summary.completed {
        tracing::info!(
            "{}: {} titles, {} reviews, {} titles failed",
            listing.listing,
            listing.identifiers,
            listing.reviews,
            listing.failed_titles
        );
    }
    for (listing, error) in &summary.failed {
        tracing::error!("{}: {}", listing, error);
    }

    Ok(())
}
