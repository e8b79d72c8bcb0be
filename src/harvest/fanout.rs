//! Bounded parallel review collection
//!
//! Every title of a listing is collected in its own tokio task held in a
//! `JoinSet`. A [`WorkerPool`] caps how many collections are in flight;
//! results are slotted back in the order the titles were submitted, not the
//! order the tasks finish. Dropping the fan-out aborts whatever is still
//! running.

use crate::harvest::{ReviewCollector, ReviewRecord, TitleRecord};
use crate::HarvestError;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Shared concurrency budget for review collection
///
/// Cloning shares the same budget. Closing the pool makes every waiting and
/// future acquisition fail, which aborts the fan-out that is using it.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// Creates a pool allowing `max_workers` collections at once (minimum 1)
    pub fn new(max_workers: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Stops handing out worker slots
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

/// Result of one fan-out
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// One group per submitted title, in submission order. A title whose
    /// collection failed contributes an empty group.
    pub groups: Vec<Vec<ReviewRecord>>,

    /// Number of titles whose collection failed
    pub failed: usize,
}

impl FanOutReport {
    /// Total number of reviews across all groups
    pub fn review_count(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}

/// Outer error: the pool itself broke. Inner error: one title failed.
type TaskResult = Result<Result<Vec<ReviewRecord>, HarvestError>, HarvestError>;

/// Collects reviews for every title with at most `max_workers` in flight
///
/// Uses a fresh [`WorkerPool`]; see [`run_on_pool`].
///
/// # Arguments
///
/// * `collector` - Review collector shared by all workers
/// * `identifiers` - Titles to collect, in output order
/// * `max_workers` - Concurrency cap (values below 1 are treated as 1)
pub async fn run_parallel(
    collector: &ReviewCollector,
    identifiers: &[TitleRecord],
    max_workers: usize,
) -> Result<FanOutReport, HarvestError> {
    run_on_pool(&WorkerPool::new(max_workers), collector, identifiers).await
}

/// Collects reviews for every title, drawing worker slots from `pool`
///
/// A title whose collection returns an error or panics is logged and yields an
/// empty group; the other titles are unaffected. If the pool is closed while
/// titles are still waiting for a slot, every remaining task is aborted and
/// `HarvestError::FanOut` is returned. All tasks are joined before this
/// returns; if the returned future is dropped, the tasks are aborted.
pub async fn run_on_pool(
    pool: &WorkerPool,
    collector: &ReviewCollector,
    identifiers: &[TitleRecord],
) -> Result<FanOutReport, HarvestError> {
    if identifiers.is_empty() {
        return Ok(FanOutReport::default());
    }

    let mut tasks: JoinSet<(usize, TaskResult)> = JoinSet::new();
    for (index, title) in identifiers.iter().cloned().enumerate() {
        let collector = collector.clone();
        let semaphore = Arc::clone(&pool.semaphore);

        tasks.spawn(async move {
            (index, collect_with_permit(collector, title, semaphore).await)
        });
    }

    let mut slots: Vec<Option<Vec<ReviewRecord>>> = identifiers.iter().map(|_| None).collect();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(Ok(reviews)))) => slots[index] = Some(reviews),
            Ok((index, Ok(Err(e)))) => {
                let title = &identifiers[index];
                tracing::error!(
                    "Review collection failed for '{}' ({}): {}",
                    title.title,
                    title.external_id,
                    e
                );
            }
            Ok((_, Err(e))) => {
                tracing::error!("Worker pool failed, aborting remaining titles: {}", e);
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                return Err(e);
            }
            Err(join_error) => {
                tracing::error!("Review task did not complete: {}", join_error);
            }
        }
    }

    let mut report = FanOutReport {
        groups: Vec::with_capacity(slots.len()),
        failed: 0,
    };
    for (slot, title) in slots.into_iter().zip(identifiers) {
        match slot {
            Some(reviews) => report.groups.push(reviews),
            None => {
                tracing::debug!("No reviews kept for '{}' ({})", title.title, title.external_id);
                report.failed += 1;
                report.groups.push(Vec::new());
            }
        }
    }

    Ok(report)
}

/// Waits for a worker slot, then collects one title
async fn collect_with_permit(
    collector: ReviewCollector,
    title: TitleRecord,
    semaphore: Arc<Semaphore>,
) -> TaskResult {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| HarvestError::FanOut(format!("worker pool closed: {}", e)))?;

    Ok(collector.collect_reviews(&title).await)
}
