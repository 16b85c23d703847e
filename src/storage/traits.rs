//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{CrawlingStatus, GameInfo, UserDocument, UsersGraphData};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines every persistence operation the crawl workers and the
/// graph collector need. Implementations are shared across tasks behind an
/// `Arc` and must serialize access to the underlying storage themselves.
#[async_trait]
pub trait DataStore: Send + Sync {
    // ===== Users =====

    /// Fetches a user document
    ///
    /// # Returns
    ///
    /// * `Ok(Some(UserDocument))` - The user has been crawled before
    /// * `Ok(None)` - No document stored for this SteamID
    async fn fetch_user(&self, steam_id: &str) -> StorageResult<Option<UserDocument>>;

    /// Inserts or replaces a user document
    async fn save_user(&self, user: &UserDocument) -> StorageResult<()>;

    // ===== Games =====

    /// Inserts or replaces game catalogue entries
    async fn save_games(&self, games: &[GameInfo]) -> StorageResult<()>;

    /// Looks up catalogue entries; unknown app IDs are skipped
    async fn fetch_game_details(&self, app_ids: &[u32]) -> StorageResult<Vec<GameInfo>>;

    // ===== Crawl status =====

    /// Fetches the progress record of a crawl
    async fn fetch_crawl_status(&self, crawl_id: &str) -> StorageResult<Option<CrawlingStatus>>;

    /// Applies progress deltas to an existing crawl status in one atomic step
    ///
    /// `delta.users_crawled` is always added. `delta.total_users_to_crawl` is
    /// only added while `current_level` is above the deepest level, since
    /// users at the deepest level never schedule anyone.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A record matched and was updated
    /// * `Ok(false)` - No record exists for `crawl_id`
    async fn update_crawl_status(
        &self,
        crawl_id: &str,
        current_level: u32,
        delta: &CrawlingStatus,
    ) -> StorageResult<bool>;

    /// Inserts a new crawl status record
    async fn insert_crawl_status(&self, status: &CrawlingStatus) -> StorageResult<()>;

    /// Looks for a finished crawl of `steam_id` that followed `level` friend
    /// hops
    ///
    /// # Returns
    ///
    /// * `Ok(Some(crawl_id))` - The most recently started such crawl
    /// * `Ok(None)` - The user was never fully crawled at this level
    async fn has_been_crawled_before(
        &self,
        steam_id: &str,
        level: u32,
    ) -> StorageResult<Option<String>>;

    // ===== Processed graphs =====

    /// Persists the final graph of a crawl
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The graph was stored
    /// * `Ok(false)` - A graph already exists for this crawl and was left untouched
    async fn save_processed_graph(
        &self,
        crawl_id: &str,
        graph: &UsersGraphData,
    ) -> StorageResult<bool>;

    /// Fetches the final graph of a crawl
    async fn fetch_processed_graph(&self, crawl_id: &str) -> StorageResult<Option<UsersGraphData>>;
}
