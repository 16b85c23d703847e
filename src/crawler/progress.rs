use crate::storage::{CrawlingStatus, DataStore};
use crate::Result;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Serializes progress writes per crawl
///
/// The store applies each delta in one statement, but the update-then-insert
/// fallback is two steps; the per-crawl lock keeps two workers from both
/// seeing "no record" and inserting twice.
pub struct ProgressTracker {
    store: Arc<dyn DataStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, crawl_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(crawl_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Records progress for one processed user
    ///
    /// Tries an in-place update first. When no record exists yet, users above
    /// the deepest level seed one; deepest-level users never create records.
    /// The crawl's lock is dropped by the write that finishes it.
    ///
    /// # Arguments
    ///
    /// * `current_level` - Level of the user being recorded
    /// * `delta` - Counter changes; see `CrawlJob::progress_delta`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - This write finished the crawl
    /// * `Ok(false)` - The crawl still has users in flight
    pub async fn save_crawling_stats(&self, current_level: u32, delta: &CrawlingStatus) -> Result<bool> {
        let lock = self.lock_for(&delta.crawl_id);
        let _guard = lock.lock().await;

        let finished = self.apply(current_level, delta).await?;
        if finished {
            self.release(&delta.crawl_id);
        }
        Ok(finished)
    }

    async fn apply(&self, current_level: u32, delta: &CrawlingStatus) -> Result<bool> {
        if self
            .store
            .update_crawl_status(&delta.crawl_id, current_level, delta)
            .await?
        {
            let status = self.store.fetch_crawl_status(&delta.crawl_id).await?;
            return Ok(status.is_some_and(|status| status.is_finished()));
        }

        if current_level < delta.max_level {
            let status = CrawlingStatus {
                total_users_to_crawl: 1 + delta.total_users_to_crawl.max(0),
                users_crawled: delta.users_crawled.max(0),
                time_started: Utc::now(),
                ..delta.clone()
            };
            self.store.insert_crawl_status(&status).await?;
            debug!(
                crawl_id = %status.crawl_id,
                total = status.total_users_to_crawl,
                "Seeded missing crawl status"
            );
            return Ok(status.is_finished());
        }

        warn!(
            crawl_id = %delta.crawl_id,
            level = current_level,
            "No crawl status to update for deepest-level user"
        );
        Ok(false)
    }

    /// Drops the lock of a crawl that will see no more progress
    pub fn release(&self, crawl_id: &str) {
        self.locks.remove(crawl_id);
    }
}
