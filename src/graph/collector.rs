//! Graph collector
//!
//! Re-walks a converged crawl through the persisted user documents. A fixed
//! set of workers look users up; the control loop owns every counter, the
//! visited set and the channel lifecycle, so workers only ever send results.

use crate::storage::{
    CrawlingStatus, DataStore, StorageError, UserDocument, UsersGraphInformation,
};
use crate::steam::SteamApi;
use crate::{CrawlerError, Result};
use flume::{Receiver, Sender, TrySendError};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// A user to look up, with the edge it was reached through
#[derive(Debug, Clone)]
struct GraphJob {
    steam_id: String,
    from_id: String,
    current_level: u32,
    max_level: u32,
}

impl GraphJob {
    fn child(&self, friend_id: &str) -> Self {
        Self {
            steam_id: friend_id.to_string(),
            from_id: self.steam_id.clone(),
            current_level: self.current_level + 1,
            max_level: self.max_level,
        }
    }
}

/// What a collector worker reports back for one job
#[derive(Debug)]
enum CollectOutcome {
    Found(GraphJob, UserDocument),
    Missing(GraphJob),
    Failed(GraphJob, StorageError),
}

/// Rebuilds a crawled graph from the store with a pool of lookup workers
pub struct GraphCollector {
    store: Arc<dyn DataStore>,
    steam: Arc<dyn SteamApi>,
    worker_count: usize,
    job_capacity: usize,
}

impl GraphCollector {
    pub fn new(
        store: Arc<dyn DataStore>,
        steam: Arc<dyn SteamApi>,
        worker_count: usize,
        job_capacity: usize,
    ) -> Self {
        Self {
            store,
            steam,
            worker_count: worker_count.max(1),
            job_capacity: job_capacity.max(1),
        }
    }

    /// Collects every user of a crawl, root first
    ///
    /// The walk starts at the crawl target on level 1 and follows friend
    /// lists level by level while the level is below the crawl's max level.
    /// Each SteamID is looked up once, at the shallowest level it is reached.
    /// Apart from the root, only public users are part of the graph, mirroring
    /// the users the crawl itself scheduled. The walk stops once as many users
    /// were collected as the crawl scheduled, or when no lookups remain.
    ///
    /// # Arguments
    ///
    /// * `status` - The crawl's finished status
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<UsersGraphInformation>)` - The root followed by the other
    ///   users, ordered by level then SteamID, with usernames backfilled
    /// * `Err(CrawlerError::GraphCollection)` - The root was never
    ///   persisted, a lookup failed, or usernames could not be resolved
    pub async fn collect(&self, status: &CrawlingStatus) -> Result<Vec<UsersGraphInformation>> {
        let crawl_id = status.crawl_id.as_str();
        let fail = |message: String| CrawlerError::GraphCollection {
            crawl_id: crawl_id.to_string(),
            message,
        };

        let (job_tx, job_rx) = flume::bounded::<GraphJob>(self.job_capacity);
        let (result_tx, result_rx) = flume::bounded::<CollectOutcome>(self.job_capacity);
        let (stop_tx, stop_rx) = flume::bounded::<()>(self.worker_count);

        let mut workers = JoinSet::new();
        for id in 0..self.worker_count {
            workers.spawn(collector_worker(
                id,
                Arc::clone(&self.store),
                job_rx.clone(),
                stop_rx.clone(),
                result_tx.clone(),
            ));
        }
        drop(result_tx);
        debug!(crawl_id, workers = self.worker_count, "Graph collector started");

        let walked = self.walk(status, &job_tx, &result_rx).await;

        // One stop per worker, then close the channels under them
        for _ in 0..self.worker_count {
            if stop_tx.send_async(()).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        drop(result_rx);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(crawl_id, "Graph collector worker panicked: {}", e);
            }
        }
        debug!(crawl_id, "Graph collector workers stopped");

        let mut users = walked.map_err(fail)?;

        let root_index = users
            .iter()
            .position(|info| info.current_level == 1)
            .ok_or_else(|| fail(format!("root user {} is not persisted", status.original_crawl_target)))?;
        let root = users.swap_remove(root_index);
        users.sort_by(|a, b| {
            a.current_level
                .cmp(&b.current_level)
                .then_with(|| a.user.steam_id().cmp(b.user.steam_id()))
        });
        users.insert(0, root);

        self.backfill_usernames(&mut users)
            .await
            .map_err(|e| fail(format!("username backfill failed: {}", e)))?;

        info!(crawl_id, users = users.len(), "Graph collected");
        Ok(users)
    }

    /// Control loop: the sole owner of the counters and the visited set
    ///
    /// Levels are walked one at a time. Friends are only scheduled once every
    /// lookup of the current level has returned, so each user is reached at
    /// its shallowest level no matter how long a single lookup takes.
    async fn walk(
        &self,
        status: &CrawlingStatus,
        job_tx: &Sender<GraphJob>,
        result_rx: &Receiver<CollectOutcome>,
    ) -> std::result::Result<Vec<UsersGraphInformation>, String> {
        let mut scheduled: HashSet<String> = HashSet::new();
        scheduled.insert(status.original_crawl_target.clone());

        let total = status.total_users_to_crawl;
        let mut users_crawled: i64 = 0;
        let mut users = Vec::new();
        let mut frontier = vec![GraphJob {
            steam_id: status.original_crawl_target.clone(),
            from_id: status.original_crawl_target.clone(),
            current_level: 1,
            max_level: status.max_level,
        }];

        while !frontier.is_empty() {
            let found = self.lookup_level(frontier, job_tx, result_rx).await?;
            let mut next = Vec::new();

            for (job, user) in found {
                if job.current_level > 1 && !user.account.is_public() {
                    trace!(steam_id = %job.steam_id, "Private user, not part of the graph");
                    continue;
                }

                if job.current_level < job.max_level {
                    for friend_id in &user.friend_ids {
                        if scheduled.insert(friend_id.clone()) {
                            next.push(job.child(friend_id));
                        }
                    }
                }

                users_crawled += 1;
                users.push(UsersGraphInformation {
                    user,
                    from_id: job.from_id,
                    current_level: job.current_level,
                    max_level: job.max_level,
                });

                if total != 0 && users_crawled >= total {
                    debug!(crawl_id = %status.crawl_id, users_crawled, total, "Graph converged");
                    return Ok(users);
                }
            }

            frontier = next;
        }

        if total != 0 && users_crawled < total {
            warn!(
                crawl_id = %status.crawl_id,
                users_crawled,
                total,
                "Graph walk ran out of users before reaching the crawl total"
            );
        }
        Ok(users)
    }

    /// Looks up one level of users and waits for every result
    ///
    /// At most `job_capacity` jobs sit in the channel; the rest are handed
    /// out as results come back. Found users are returned ordered by SteamID
    /// so the next level is scheduled the same way on every run.
    async fn lookup_level(
        &self,
        jobs: Vec<GraphJob>,
        job_tx: &Sender<GraphJob>,
        result_rx: &Receiver<CollectOutcome>,
    ) -> std::result::Result<Vec<(GraphJob, UserDocument)>, String> {
        let mut queued: VecDeque<GraphJob> = jobs.into();
        let mut in_flight: usize = 0;
        let mut found = Vec::new();

        while !queued.is_empty() || in_flight > 0 {
            while let Some(job) = queued.pop_front() {
                match job_tx.try_send(job) {
                    Ok(()) => in_flight += 1,
                    Err(TrySendError::Full(job)) => {
                        queued.push_front(job);
                        break;
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        return Err("job channel closed".to_string());
                    }
                }
            }

            let outcome = result_rx
                .recv_async()
                .await
                .map_err(|_| "every collector worker exited".to_string())?;
            in_flight -= 1;

            match outcome {
                CollectOutcome::Found(job, user) => found.push((job, user)),
                CollectOutcome::Missing(job) => {
                    trace!(steam_id = %job.steam_id, "User not persisted, skipping");
                }
                CollectOutcome::Failed(job, e) => {
                    return Err(format!("lookup of {} failed: {}", job.steam_id, e));
                }
            }
        }

        found.sort_by(|a, b| a.0.steam_id.cmp(&b.0.steam_id));
        Ok(found)
    }

    /// Resolves every empty username with one batched lookup
    async fn backfill_usernames(
        &self,
        users: &mut [UsersGraphInformation],
    ) -> crate::steam::SteamResult<()> {
        let missing: Vec<String> = users
            .iter()
            .filter(|info| info.user.username().is_empty())
            .map(|info| info.user.steam_id().to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        debug!(users = missing.len(), "Backfilling usernames");
        let names = self.steam.resolve_usernames(&missing).await?;
        for info in users.iter_mut() {
            if !info.user.username().is_empty() {
                continue;
            }
            if let Some(name) = names.get(info.user.steam_id()) {
                info.user.account.persona_name = name.clone();
            }
        }
        Ok(())
    }
}

/// Looks users up until told to stop or until its channels close
async fn collector_worker(
    id: usize,
    store: Arc<dyn DataStore>,
    jobs: Receiver<GraphJob>,
    stop: Receiver<()>,
    results: Sender<CollectOutcome>,
) {
    loop {
        let job = tokio::select! {
            biased;

            _ = stop.recv_async() => break,

            job = jobs.recv_async() => match job {
                Ok(job) => job,
                Err(_) => break,
            },
        };

        let outcome = if job.current_level > job.max_level {
            CollectOutcome::Missing(job)
        } else {
            match store.fetch_user(&job.steam_id).await {
                Ok(Some(user)) => CollectOutcome::Found(job, user),
                Ok(None) => CollectOutcome::Missing(job),
                Err(e) => CollectOutcome::Failed(job, e),
            }
        };

        if results.send_async(outcome).await.is_err() {
            break;
        }
    }
    trace!(worker_id = id, "Graph collector worker exited");
}
