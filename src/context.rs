//! Explicit wiring of the crawler's collaborators
//!
//! Every component receives a `CrawlContext` (usually behind an `Arc`) at
//! construction instead of reaching for process-wide handles.

use crate::config::Config;
use crate::crawler::ProgressTracker;
use crate::queue::{connect_queue, JobPublisher, JobQueue};
use crate::state::CrawlSessions;
use crate::steam::{SteamApi, SteamWebClient};
use crate::storage::{DataStore, SqliteStore};
use crate::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Tunables the engine reads at run time
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Highest level a crawl request may ask for
    pub max_crawl_level: u32,
    /// Number of crawl workers in a pool
    pub crawl_workers: usize,
    /// Backoff step between job publish attempts
    pub publish_retry_step: Duration,
    /// Number of graph collector workers
    pub graph_workers: usize,
    /// Capacity of the graph collector's channels
    pub graph_job_capacity: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_crawl_level: 3,
            crawl_workers: 10,
            publish_retry_step: Duration::from_millis(200),
            graph_workers: 6,
            graph_job_capacity: 70_000,
        }
    }
}

impl From<&Config> for CrawlSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_crawl_level: config.crawler.max_crawl_level,
            crawl_workers: config.crawler.worker_count as usize,
            publish_retry_step: Duration::from_millis(config.crawler.publish_retry_delay_ms),
            graph_workers: config.graph.worker_count as usize,
            graph_job_capacity: config.graph.job_capacity,
        }
    }
}

/// Shared handles used by the dispatcher, crawl workers and graph collector
pub struct CrawlContext {
    pub store: Arc<dyn DataStore>,
    pub steam: Arc<dyn SteamApi>,
    pub queue: Arc<dyn JobQueue>,
    pub publisher: JobPublisher,
    pub progress: ProgressTracker,
    pub sessions: CrawlSessions,
    pub settings: CrawlSettings,
}

impl CrawlContext {
    /// Wires a context from already-built collaborators
    pub fn new(
        store: Arc<dyn DataStore>,
        steam: Arc<dyn SteamApi>,
        queue: Arc<dyn JobQueue>,
        settings: CrawlSettings,
    ) -> Self {
        let publisher = JobPublisher::new(Arc::clone(&queue), settings.publish_retry_step);
        let progress = ProgressTracker::new(Arc::clone(&store));

        Self {
            store,
            steam,
            queue,
            publisher,
            progress,
            sessions: CrawlSessions::new(),
            settings,
        }
    }

    /// Opens the database, builds the Steam client and connects the queue
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlContext)` - All collaborators are ready
    /// * `Err(CrawlerError)` - The store, client or broker could not be set up
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = SqliteStore::new(Path::new(&config.storage.database_path))?;
        let steam = SteamWebClient::new(&config.steam_api)?;
        let queue = connect_queue(&config.queue).await?;

        Ok(Self::new(
            Arc::new(store),
            Arc::new(steam),
            queue,
            CrawlSettings::from(config),
        ))
    }
}
