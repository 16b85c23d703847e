use crate::context::CrawlContext;
use crate::crawler::CrawlJob;
use crate::steam::filter_valid_steam_ids;
use crate::storage::CrawlingStatus;
use crate::{Result, ValidationError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// An incoming request to crawl one or more users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    pub steam_ids: Vec<String>,
    /// Friend hops to follow from each target, 1..=max-crawl-level
    pub level: u32,
}

/// A crawl that was accepted and seeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedCrawl {
    pub crawl_id: String,
    pub steam_id: String,
}

/// Validates crawl requests and seeds their first jobs
pub struct CrawlDispatcher {
    ctx: Arc<CrawlContext>,
}

impl CrawlDispatcher {
    pub fn new(ctx: Arc<CrawlContext>) -> Self {
        Self { ctx }
    }

    /// Checks a requested level against the configured range
    pub fn validate_level(&self, level: u32) -> std::result::Result<(), ValidationError> {
        let max = self.ctx.settings.max_crawl_level;
        if level < 1 || level > max {
            return Err(ValidationError::LevelOutOfRange { level, max });
        }
        Ok(())
    }

    /// Starts one crawl per valid SteamID in the request
    ///
    /// Malformed IDs are dropped as long as one valid ID remains. Each
    /// remaining ID gets its own crawl ID. Returns as soon as the root jobs
    /// are published; crawling itself happens in the worker pool.
    ///
    /// # Arguments
    ///
    /// * `request` - Target IDs and the number of friend hops to follow
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<StartedCrawl>)` - The crawls that were seeded
    /// * `Err(CrawlerError::Validation)` - Bad level, or no valid IDs at all
    pub async fn crawl_users(&self, request: &CrawlRequest) -> Result<Vec<StartedCrawl>> {
        self.validate_level(request.level)?;
        let steam_ids = filter_valid_steam_ids(&request.steam_ids)?;

        let mut started = Vec::with_capacity(steam_ids.len());
        for steam_id in steam_ids {
            let crawl_id = Uuid::new_v4().to_string();
            self.crawl_user(&steam_id, &crawl_id, request.level).await?;
            started.push(StartedCrawl { crawl_id, steam_id });
        }
        Ok(started)
    }

    /// Finds a finished crawl of `steam_id` that followed `level` friend hops
    ///
    /// Lets a caller reuse a stored graph instead of crawling again.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(crawl_id))` - The latest such crawl
    /// * `Ok(None)` - No finished crawl at this level
    /// * `Err(CrawlerError::Validation)` - Bad level or malformed SteamID
    pub async fn has_been_crawled_before(&self, steam_id: &str, level: u32) -> Result<Option<String>> {
        self.validate_level(level)?;
        if !crate::steam::is_valid_steam_id(steam_id) {
            return Err(ValidationError::InvalidSteamId(steam_id.to_string()).into());
        }
        Ok(self.ctx.store.has_been_crawled_before(steam_id, level).await?)
    }

    /// Seeds a single crawl
    ///
    /// The root counts as level 1, so following `level` friend hops makes
    /// `level + 1` the deepest crawl level. The status record is written
    /// before the root job is published so no worker can report progress
    /// against a crawl that does not exist yet.
    ///
    /// # Arguments
    ///
    /// * `target` - Root SteamID (already validated)
    /// * `crawl_id` - ID identifying the crawl
    /// * `level` - Friend hops to follow
    pub async fn crawl_user(&self, target: &str, crawl_id: &str, level: u32) -> Result<()> {
        self.validate_level(level)?;
        if !crate::steam::is_valid_steam_id(target) {
            return Err(ValidationError::InvalidSteamId(target.to_string()).into());
        }

        let max_level = level + 1;
        let job = CrawlJob::root(crawl_id, target, max_level);

        self.ctx.sessions.claim(crawl_id, target, 1);
        self.ctx
            .store
            .insert_crawl_status(&CrawlingStatus {
                crawl_id: crawl_id.to_string(),
                original_crawl_target: target.to_string(),
                max_level,
                total_users_to_crawl: 1,
                users_crawled: 0,
                time_started: Utc::now(),
            })
            .await?;

        if let Err(e) = self.ctx.publisher.publish_job(&job).await {
            error!(crawl_id, steam_id = target, "Failed to publish root job: {}", e);
            return Err(e.into());
        }

        info!(crawl_id, steam_id = target, max_level, "Crawl started");
        Ok(())
    }
}
