//! Crawl worker
//!
//! A worker consumes job deliveries and runs each job through its phases:
//!
//! | Phase | Work |
//! |-------|------|
//! | ResolvingFriends | Store lookup; Steam friend list on a miss |
//! | ResolvingProfile | Player summary, owned games capped at 50, game catalogue |
//! | Persisting | Save the user document |
//! | FanOut | Record progress, publish one job per unclaimed public friend |
//!
//! A cache hit goes straight from ResolvingFriends to FanOut. A failure while
//! resolving a user abandons only that job; the worker goes back to Idle.

use crate::context::CrawlContext;
use crate::crawler::CrawlJob;
use crate::graph::top_fifty_or_fewer_games;
use crate::queue::QueueError;
use crate::state::WorkerPhase;
use crate::steam::{fetch_summaries_batched, public_profiles, SteamApiError};
use crate::storage::{AccountDetails, GameInfo, OwnedGame, UserDocument};
use crate::{CrawlerError, Result};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// One member of the crawl worker pool
pub struct CrawlWorker {
    id: usize,
    ctx: Arc<CrawlContext>,
    phase: WorkerPhase,
}

impl CrawlWorker {
    pub fn new(id: usize, ctx: Arc<CrawlContext>) -> Self {
        Self {
            id,
            ctx,
            phase: WorkerPhase::Idle,
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    fn transition(&mut self, next: WorkerPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(CrawlerError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        trace!(worker_id = self.id, from = %self.phase, to = %next, "Worker phase change");
        self.phase = next;
        Ok(())
    }

    /// Consumes deliveries until cancelled
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The token was cancelled
    /// * `Err(CrawlerError)` - A malformed delivery arrived or the delivery
    ///   stream ended; the pool restarts the worker
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        let mut deliveries = self.ctx.queue.consume().await?;
        debug!(worker_id = self.id, "Crawl worker started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    debug!(worker_id = self.id, "Crawl worker stopping");
                    return Ok(());
                }

                delivery = deliveries.next() => match delivery {
                    Some(payload) => self.process_delivery(&payload).await?,
                    None => return Err(QueueError::Closed.into()),
                },
            }
        }
    }

    /// Decodes one delivery and processes the job it carries
    pub async fn process_delivery(&mut self, payload: &[u8]) -> Result<()> {
        let job = CrawlJob::decode(payload)?;
        self.process_job(&job).await
    }

    /// Runs one job through every phase and returns to Idle
    ///
    /// Resolution failures abandon the job and still count the user as
    /// crawled, so the crawl can converge. Only invariant violations are
    /// returned as errors.
    pub async fn process_job(&mut self, job: &CrawlJob) -> Result<()> {
        self.transition(WorkerPhase::ResolvingFriends)?;
        self.ctx
            .sessions
            .claim(&job.crawl_id, &job.steam_id, job.current_level);

        let friend_ids = match self.resolve_user(job).await {
            Ok(friend_ids) => friend_ids,
            Err(e @ CrawlerError::InvalidTransition { .. }) => return Err(e),
            Err(e) => {
                warn!(
                    worker_id = self.id,
                    crawl_id = %job.crawl_id,
                    steam_id = %job.steam_id,
                    phase = %self.phase,
                    "Abandoning job: {}",
                    e
                );
                self.transition(WorkerPhase::Idle)?;
                self.record_progress(job, 1, 0).await;
                return Ok(());
            }
        };

        self.fan_out(job, &friend_ids).await;
        self.transition(WorkerPhase::Idle)
    }

    /// Resolves a user's friend list, crawling the user if it is new
    ///
    /// Leaves the worker in the FanOut phase on success.
    async fn resolve_user(&mut self, job: &CrawlJob) -> Result<Vec<String>> {
        let cached = match self.ctx.store.fetch_user(&job.steam_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(
                    steam_id = %job.steam_id,
                    "Store lookup failed, falling back to Steam API: {}",
                    e
                );
                None
            }
        };

        if let Some(user) = cached {
            trace!(steam_id = %job.steam_id, "Cache hit");
            self.transition(WorkerPhase::FanOut)?;
            return Ok(user.friend_ids);
        }

        let friend_ids = match self.ctx.steam.fetch_friends(&job.steam_id).await {
            Ok(friend_ids) => friend_ids,
            // Hidden friend lists are recorded as empty
            Err(SteamApiError::PrivateProfile(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        self.transition(WorkerPhase::ResolvingProfile)?;
        let user = self.resolve_profile(job, friend_ids).await?;

        self.transition(WorkerPhase::Persisting)?;
        self.ctx.store.save_user(&user).await?;

        self.transition(WorkerPhase::FanOut)?;
        Ok(user.friend_ids)
    }

    /// Builds the document of a newly seen user
    ///
    /// Games are only fetched for public profiles; private ones are still
    /// recorded, without games.
    async fn resolve_profile(&self, job: &CrawlJob, friend_ids: Vec<String>) -> Result<UserDocument> {
        let player = self
            .ctx
            .steam
            .fetch_player_summaries(&job.steam_id)
            .await?
            .into_iter()
            .find(|p| p.steam_id == job.steam_id)
            .ok_or_else(|| SteamApiError::PlayerNotFound(job.steam_id.clone()))?;

        let games_owned = if player.is_public() {
            let games = top_fifty_or_fewer_games(self.ctx.steam.fetch_owned_games(&job.steam_id).await?);
            let catalogue: Vec<GameInfo> = games.iter().map(GameInfo::from).collect();
            self.ctx.store.save_games(&catalogue).await?;
            games.iter().map(OwnedGame::from).collect()
        } else {
            Vec::new()
        };

        Ok(UserDocument {
            account: AccountDetails::from(player),
            friend_ids,
            games_owned,
        })
    }

    /// Records this user's progress and publishes jobs for new public friends
    ///
    /// A job whose user has since been claimed at a shallower level only
    /// counts; the shallower job expands the user's friends instead.
    async fn fan_out(&self, job: &CrawlJob, friend_ids: &[String]) {
        if !job.can_expand() {
            self.record_progress(job, 1, 0).await;
            return;
        }

        if let Some(level) = self.superseded_by(job) {
            debug!(
                crawl_id = %job.crawl_id,
                steam_id = %job.steam_id,
                level = job.current_level,
                shallowest = level,
                "User reached at a shallower level, not expanding"
            );
            self.record_progress(job, 1, 0).await;
            return;
        }

        let children = match self.schedule_public_friends(job, friend_ids).await {
            Ok(children) => children,
            Err(e) => {
                warn!(
                    crawl_id = %job.crawl_id,
                    steam_id = %job.steam_id,
                    "Could not resolve friend profiles, not expanding: {}",
                    e
                );
                Vec::new()
            }
        };

        // Children are counted before they are published so the crawl can't
        // look finished while they are in flight.
        self.record_progress(job, 1, children.len() as i64).await;

        let mut dropped = 0i64;
        for child in &children {
            if let Err(e) = self.ctx.publisher.publish_job(child).await {
                error!(
                    crawl_id = %child.crawl_id,
                    steam_id = %child.steam_id,
                    "Dropping child job after retries: {}",
                    e
                );
                dropped += 1;
            }
        }

        if dropped > 0 {
            self.record_progress(job, 0, -dropped).await;
        }

        debug!(
            worker_id = self.id,
            crawl_id = %job.crawl_id,
            steam_id = %job.steam_id,
            level = job.current_level,
            scheduled = children.len() as i64 - dropped,
            "User crawled"
        );
    }

    fn superseded_by(&self, job: &CrawlJob) -> Option<u32> {
        self.ctx
            .sessions
            .claimed_level(&job.crawl_id, &job.steam_id)
            .filter(|&level| level < job.current_level)
    }

    /// Claims every public friend not yet claimed at the next level or above
    /// and builds its job
    async fn schedule_public_friends(
        &self,
        job: &CrawlJob,
        friend_ids: &[String],
    ) -> Result<Vec<CrawlJob>> {
        if friend_ids.is_empty() {
            return Ok(Vec::new());
        }

        let players = fetch_summaries_batched(self.ctx.steam.as_ref(), friend_ids).await?;
        Ok(public_profiles(players)
            .into_iter()
            .filter(|p| {
                self.ctx
                    .sessions
                    .claim(&job.crawl_id, &p.steam_id, job.current_level + 1)
            })
            .filter_map(|p| job.child(&p.steam_id))
            .collect())
    }

    async fn record_progress(&self, job: &CrawlJob, users_crawled: i64, users_scheduled: i64) {
        let delta = job.progress_delta(users_crawled, users_scheduled);
        let finished = match self
            .ctx
            .progress
            .save_crawling_stats(job.current_level, &delta)
            .await
        {
            Ok(finished) => finished,
            Err(e) => {
                error!(crawl_id = %job.crawl_id, "Failed to save crawl progress: {}", e);
                return;
            }
        };

        if job.current_level == 1 && users_crawled > 0 {
            info!(
                crawl_id = %job.crawl_id,
                friends_scheduled = users_scheduled,
                "Crawl root resolved"
            );
        }

        // Nothing is in flight once a crawl is finished, so its claims can go
        if finished {
            self.ctx.sessions.forget(&job.crawl_id);
            info!(crawl_id = %job.crawl_id, "Crawl finished");
        }
    }
}
