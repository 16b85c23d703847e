use super::traits::{JobQueue, QueueResult};
use crate::crawler::CrawlJob;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, warn};

/// Most publish attempts made for one job, the first included
pub const PUBLISH_ATTEMPTS: u32 = 4;

/// Publishes crawl jobs, retrying transient broker failures
///
/// Delays grow linearly: `step`, `2 * step`, `3 * step`. Holds no mutable
/// state, so a single publisher is shared by every worker.
#[derive(Clone)]
pub struct JobPublisher {
    queue: Arc<dyn JobQueue>,
    retry_step: Duration,
}

impl JobPublisher {
    pub fn new(queue: Arc<dyn JobQueue>, retry_step: Duration) -> Self {
        Self { queue, retry_step }
    }

    /// Encodes and publishes one crawl job
    ///
    /// # Arguments
    ///
    /// * `job` - The job to publish
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Some attempt succeeded
    /// * `Err(QueueError)` - Encoding failed, or the error of the last of
    ///   four failed attempts
    pub async fn publish_job(&self, job: &CrawlJob) -> QueueResult<()> {
        let payload = Bytes::from(serde_json::to_vec(job)?);
        self.publish_with_retry(payload).await?;
        debug!(
            crawl_id = %job.crawl_id,
            steam_id = %job.steam_id,
            level = job.current_level,
            "Published crawl job"
        );
        Ok(())
    }

    /// Publishes a raw payload with the retry policy
    pub async fn publish_with_retry(&self, payload: Bytes) -> QueueResult<()> {
        let step = self.retry_step;
        let strategy = (1..PUBLISH_ATTEMPTS).map(move |n| step * n);

        Retry::spawn(strategy, || {
            let queue = Arc::clone(&self.queue);
            let payload = payload.clone();

            async move {
                match queue.publish(payload).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        warn!("Failed to publish job, will retry: {}", e);
                        RetryError::to_transient(e)
                    }
                }
            }
        })
        .await
    }
}

impl std::fmt::Debug for JobPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobPublisher")
            .field("retry_step", &self.retry_step)
            .finish()
    }
}
