use serde::Deserialize;

/// Main configuration structure for Steamgraph
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(rename = "steam-api")]
    pub steam_api: SteamApiConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawl worker pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent crawl workers consuming from the job queue
    #[serde(rename = "worker-count")]
    pub worker_count: u32,

    /// Highest level a crawl request may ask for
    #[serde(rename = "max-crawl-level", default = "default_max_crawl_level")]
    pub max_crawl_level: u32,

    /// Backoff step between job publish attempts (milliseconds)
    #[serde(
        rename = "publish-retry-delay-ms",
        default = "default_publish_retry_delay_ms"
    )]
    pub publish_retry_delay_ms: u64,
}

/// Graph collector configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Number of collector workers re-walking the persisted graph
    #[serde(rename = "worker-count", default = "default_graph_worker_count")]
    pub worker_count: u32,

    /// Capacity of the collector's job and result channels
    #[serde(rename = "job-capacity", default = "default_job_capacity")]
    pub job_capacity: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            worker_count: default_graph_worker_count(),
            job_capacity: default_job_capacity(),
        }
    }
}

/// Steam Web API access configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SteamApiConfig {
    /// Base URL of the Steam Web API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// API key; falls back to the `STEAM_API_KEY` environment variable when empty
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    /// Per-request timeout (seconds)
    #[serde(
        rename = "request-timeout-secs",
        default = "default_request_timeout_secs"
    )]
    pub request_timeout_secs: u64,
}

/// Which broker carries crawl jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// In-process flume channel; jobs only reach workers in the same process
    Memory,
    /// NATS subject consumed through a queue group
    Nats,
}

/// Job queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_backend")]
    pub backend: QueueBackend,

    #[serde(rename = "nats-url", default = "default_nats_url")]
    pub nats_url: String,

    /// Subject crawl jobs are published to
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Queue group shared by competing workers
    #[serde(rename = "queue-group", default = "default_queue_group")]
    pub queue_group: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            nats_url: default_nats_url(),
            subject: default_subject(),
            queue_group: default_queue_group(),
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Export configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory processed graphs are exported into
    #[serde(rename = "export-dir", default = "default_export_dir")]
    pub export_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
        }
    }
}

fn default_max_crawl_level() -> u32 {
    3
}

fn default_publish_retry_delay_ms() -> u64 {
    200
}

fn default_graph_worker_count() -> u32 {
    6
}

fn default_job_capacity() -> usize {
    70_000
}

fn default_base_url() -> String {
    "https://api.steampowered.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_backend() -> QueueBackend {
    QueueBackend::Memory
}

fn default_nats_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_subject() -> String {
    "steamgraph.crawl-jobs".to_string()
}

fn default_queue_group() -> String {
    "steamgraph-crawlers".to_string()
}

fn default_export_dir() -> String {
    "./graphs".to_string()
}
