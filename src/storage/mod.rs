//! Storage module for persisting crawl data
//!
//! This module handles all persistence for the crawler, including:
//! - SQLite database initialization and schema management
//! - User documents (account details, friend IDs, owned games)
//! - The game catalogue used to label aggregated top games
//! - Per-crawl progress (`CrawlingStatus`)
//! - Processed graph artifacts

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStore;
pub use traits::{DataStore, StorageError, StorageResult};

use crate::steam::{ApiOwnedGame, Player, PUBLIC_VISIBILITY_STATE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Opens (or creates) the SQLite store at the given path
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_store(path: &Path) -> StorageResult<SqliteStore> {
    SqliteStore::new(path)
}

/// Account details of a user, taken from their player summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountDetails {
    pub steam_id: String,
    pub persona_name: String,
    pub profile_url: String,
    pub avatar: String,
    pub time_created: i64,
    pub loc_country_code: String,
    /// `communityvisibilitystate` at the time the user was crawled
    pub visibility_state: u8,
}

impl AccountDetails {
    pub fn is_public(&self) -> bool {
        self.visibility_state == PUBLIC_VISIBILITY_STATE
    }
}

impl From<Player> for AccountDetails {
    fn from(player: Player) -> Self {
        Self {
            steam_id: player.steam_id,
            persona_name: player.persona_name,
            profile_url: player.profile_url,
            avatar: player.avatar,
            time_created: player.time_created,
            loc_country_code: player.loc_country_code,
            visibility_state: player.community_visibility_state,
        }
    }
}

/// A game a user owns, with their total playtime in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedGame {
    pub app_id: u32,
    pub playtime_forever: u64,
}

impl From<&ApiOwnedGame> for OwnedGame {
    fn from(game: &ApiOwnedGame) -> Self {
        Self {
            app_id: game.app_id,
            playtime_forever: game.playtime_forever,
        }
    }
}

/// Display metadata for a game, stored once per app ID
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GameInfo {
    pub app_id: u32,
    pub name: String,
    pub img_icon_url: String,
    pub img_logo_url: String,
}

impl From<&ApiOwnedGame> for GameInfo {
    fn from(game: &ApiOwnedGame) -> Self {
        Self {
            app_id: game.app_id,
            name: game.name.clone(),
            img_icon_url: game.img_icon_url.clone(),
            img_logo_url: game.img_logo_url.clone(),
        }
    }
}

/// Persisted snapshot of one user
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserDocument {
    pub account: AccountDetails,
    pub friend_ids: Vec<String>,
    pub games_owned: Vec<OwnedGame>,
}

impl UserDocument {
    pub fn steam_id(&self) -> &str {
        &self.account.steam_id
    }

    pub fn username(&self) -> &str {
        &self.account.persona_name
    }
}

/// Aggregate progress of one crawl
///
/// When passed to `DataStore::update_crawl_status` the two counters are
/// deltas to apply rather than absolute values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlingStatus {
    pub crawl_id: String,
    pub original_crawl_target: String,
    pub max_level: u32,
    pub total_users_to_crawl: i64,
    pub users_crawled: i64,
    pub time_started: DateTime<Utc>,
}

impl CrawlingStatus {
    /// Returns true once every scheduled user has been processed
    pub fn is_finished(&self) -> bool {
        self.total_users_to_crawl != 0 && self.users_crawled >= self.total_users_to_crawl
    }

    /// Returns true while workers are still expected to process users
    pub fn is_active(&self) -> bool {
        !self.is_finished()
    }

    /// Share of scheduled users processed so far, in percent
    pub fn progress_percent(&self) -> f64 {
        if self.total_users_to_crawl <= 0 {
            return 0.0;
        }
        (self.users_crawled as f64 / self.total_users_to_crawl as f64) * 100.0
    }
}

/// A user reached by the graph collector, with where it was reached from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersGraphInformation {
    pub user: UserDocument,
    pub from_id: String,
    pub current_level: u32,
    pub max_level: u32,
}

/// One of the most played games across a crawled graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopGame {
    pub app_id: u32,
    pub name: String,
    pub img_icon_url: String,
    pub img_logo_url: String,
    /// Summed playtime in minutes across every user in the graph
    pub total_playtime: u64,
}

/// Final artifact of a crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersGraphData {
    pub user_details: UsersGraphInformation,
    pub friend_details: Vec<UsersGraphInformation>,
    pub top_game_details: Vec<TopGame>,
}
