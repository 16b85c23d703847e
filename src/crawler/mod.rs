//! Crawler module for the broker-backed crawl
//!
//! This module contains the crawl-side engine, including:
//! - `CrawlJob`, the unit of breadth-first work
//! - The dispatcher that validates requests and seeds root jobs
//! - Per-crawl progress tracking
//! - Crawl workers and the pool that supervises them

mod dispatcher;
mod job;
mod pool;
mod progress;
mod worker;

pub use dispatcher::{CrawlDispatcher, CrawlRequest, StartedCrawl};
pub use job::CrawlJob;
pub use pool::CrawlWorkerPool;
pub use progress::ProgressTracker;
pub use worker::CrawlWorker;

use crate::storage::{CrawlingStatus, DataStore};
use crate::{CrawlerError, Result};
use std::time::Duration;
use tracing::debug;

/// Polls a crawl's status until every scheduled user has been processed
///
/// # Arguments
///
/// * `store` - Store holding the crawl status
/// * `crawl_id` - The crawl to watch
/// * `poll_interval` - Time between status reads
///
/// # Returns
///
/// * `Ok(CrawlingStatus)` - The finished status
/// * `Err(CrawlerError::CrawlNotFound)` - No status exists for the crawl
pub async fn wait_until_finished(
    store: &dyn DataStore,
    crawl_id: &str,
    poll_interval: Duration,
) -> Result<CrawlingStatus> {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        ticker.tick().await;

        let status = store
            .fetch_crawl_status(crawl_id)
            .await?
            .ok_or_else(|| CrawlerError::CrawlNotFound(crawl_id.to_string()))?;

        if status.is_finished() {
            return Ok(status);
        }

        debug!(
            crawl_id,
            crawled = status.users_crawled,
            total = status.total_users_to_crawl,
            "Crawl in progress"
        );
    }
}
