use crate::context::CrawlContext;
use crate::crawler::CrawlWorker;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Pause before a failed worker is replaced, so a broken broker connection
/// doesn't turn into a tight restart loop
const RESPAWN_DELAY: Duration = Duration::from_millis(500);

/// Fixed-size set of crawl workers supervised until cancellation
pub struct CrawlWorkerPool {
    ctx: Arc<CrawlContext>,
    worker_count: usize,
}

impl CrawlWorkerPool {
    pub fn new(ctx: Arc<CrawlContext>, worker_count: usize) -> Self {
        Self {
            ctx,
            worker_count: worker_count.max(1),
        }
    }

    fn spawn_worker(
        &self,
        workers: &mut JoinSet<(usize, Result<()>)>,
        id: usize,
        cancel: CancellationToken,
        delay: Option<Duration>,
    ) {
        let worker = CrawlWorker::new(id, Arc::clone(&self.ctx));
        workers.spawn(async move {
            if let Some(delay) = delay {
                tokio::select! {
                    _ = cancel.cancelled() => return (id, Ok(())),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            (id, worker.run(cancel).await)
        });
    }

    /// Runs the pool until the token is cancelled
    ///
    /// A worker that fails, on a malformed delivery or a closed stream, is
    /// logged and replaced with a fresh one under the same ID. Returns once
    /// every worker has stopped.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut workers = JoinSet::new();
        for id in 0..self.worker_count {
            self.spawn_worker(&mut workers, id, cancel.clone(), None);
        }
        info!(workers = self.worker_count, "Crawl worker pool started");

        let mut next_id = self.worker_count;
        while let Some(joined) = workers.join_next().await {
            let restart_id = match joined {
                Ok((id, Ok(()))) => {
                    debug!(worker_id = id, "Crawl worker exited");
                    continue;
                }
                Ok((id, Err(e))) => {
                    error!(worker_id = id, "Crawl worker failed: {}", e);
                    id
                }
                Err(e) => {
                    error!("Crawl worker panicked: {}", e);
                    let id = next_id;
                    next_id += 1;
                    id
                }
            };

            if !cancel.is_cancelled() {
                info!(worker_id = restart_id, "Restarting crawl worker");
                self.spawn_worker(&mut workers, restart_id, cancel.clone(), Some(RESPAWN_DELAY));
            }
        }

        info!("Crawl worker pool stopped");
        Ok(())
    }
}
