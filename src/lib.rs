//! Steamgraph: a concurrent social-graph crawler for Steam friend networks
//!
//! This crate crawls a user and their friends, transitively, up to a bounded
//! level by fanning jobs out across a pool of workers fed by a message broker.
//! Once a crawl has converged, a second in-process worker pool re-walks the
//! persisted users to assemble an exportable graph with the most played games.

pub mod config;
pub mod context;
pub mod crawler;
pub mod graph;
pub mod output;
pub mod queue;
pub mod state;
pub mod steam;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid crawl request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Steam API error: {0}")]
    SteamApi(#[from] steam::SteamApiError),

    #[error("Job queue error: {0}")]
    Queue(#[from] queue::QueueError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid job received: {0}")]
    InvalidJob(String),

    #[error("Invalid worker phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::WorkerPhase,
        to: state::WorkerPhase,
    },

    #[error("Crawl status not found for crawl {0}")]
    CrawlNotFound(String),

    #[error("Graph collection for crawl {crawl_id} failed: {message}")]
    GraphCollection { crawl_id: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while validating a crawl request, before anything is enqueued
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("level {level} is outside the allowed range 1..={max}")]
    LevelOutOfRange { level: u32, max: u32 },

    #[error("no valid format steam IDs given")]
    NoValidSteamIds,

    #[error("invalid format steam ID: {0}")]
    InvalidSteamId(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use context::CrawlContext;
pub use crawler::{CrawlDispatcher, CrawlJob, CrawlWorkerPool};
pub use graph::{collect_graph_data, GraphCollector, UsersGraphData, UsersGraphInformation};
pub use state::WorkerPhase;
pub use storage::{CrawlingStatus, DataStore, SqliteStore, UserDocument};
