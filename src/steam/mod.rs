//! Steam Web API access
//!
//! This module provides:
//! - SteamID format validation for incoming crawl requests
//! - Batching of ID lists to respect the 100-IDs-per-call summary limit
//! - The `SteamApi` trait the crawler and graph collector depend on
//! - A reqwest-backed implementation, `SteamWebClient`

mod client;
#[cfg(test)]
pub(crate) mod fake;
mod types;

pub use client::{build_http_client, SteamWebClient};
pub use types::{ApiOwnedGame, Player, PUBLIC_VISIBILITY_STATE};

use crate::ValidationError;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

/// Length of a 64-bit SteamID written in decimal
pub const STEAM_ID_LENGTH: usize = 17;

/// Most SteamIDs `GetPlayerSummaries` accepts per call
pub const SUMMARY_BATCH_LIMIT: usize = 100;

/// Errors returned by the Steam Web API layer
#[derive(Debug, Error)]
pub enum SteamApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("Profile {0} is private")]
    PrivateProfile(String),

    #[error("No player summary returned for {0}")]
    PlayerNotFound(String),

    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for Steam Web API operations
pub type SteamResult<T> = std::result::Result<T, SteamApiError>;

/// External social-graph API used by the crawl workers and graph collector
#[async_trait]
pub trait SteamApi: Send + Sync {
    /// Returns the SteamIDs on a user's friend list
    async fn fetch_friends(&self, steam_id: &str) -> SteamResult<Vec<String>>;

    /// Returns every game a user owns, with app info
    async fn fetch_owned_games(&self, steam_id: &str) -> SteamResult<Vec<ApiOwnedGame>>;

    /// Returns summaries for up to 100 comma-joined SteamIDs
    async fn fetch_player_summaries(&self, comma_joined_ids: &str) -> SteamResult<Vec<Player>>;

    /// Maps SteamIDs to their current persona names
    ///
    /// IDs the API has no summary for are absent from the returned map.
    async fn resolve_usernames(&self, steam_ids: &[String]) -> SteamResult<HashMap<String, String>> {
        let mut names = HashMap::with_capacity(steam_ids.len());
        for batch in break_into_stacks_of_100_or_less(steam_ids) {
            for player in self.fetch_player_summaries(&batch).await? {
                names.insert(player.steam_id, player.persona_name);
            }
        }
        Ok(names)
    }
}

/// Checks whether a string is a well-formed 64-bit SteamID
///
/// # Examples
///
/// ```
/// use steamgraph::steam::is_valid_steam_id;
///
/// assert!(is_valid_steam_id("76561197960287930"));
/// assert!(!is_valid_steam_id("7656119796028793"));
/// assert!(!is_valid_steam_id("7656119796028793a"));
/// ```
pub fn is_valid_steam_id(steam_id: &str) -> bool {
    steam_id.len() == STEAM_ID_LENGTH && steam_id.bytes().all(|b| b.is_ascii_digit())
}

/// Drops malformed SteamIDs from a request
///
/// # Arguments
///
/// * `steam_ids` - The IDs named by a crawl request
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The well-formed IDs, in request order
/// * `Err(ValidationError::NoValidSteamIds)` - Every ID was malformed
pub fn filter_valid_steam_ids(steam_ids: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut valid = Vec::with_capacity(steam_ids.len());
    for steam_id in steam_ids {
        let trimmed = steam_id.trim();
        if is_valid_steam_id(trimmed) {
            valid.push(trimmed.to_string());
        } else {
            warn!(steam_id = %steam_id, "Dropping invalid format steam ID");
        }
    }

    if valid.is_empty() {
        return Err(ValidationError::NoValidSteamIds);
    }
    Ok(valid)
}

/// Splits a list of SteamIDs into comma-joined batches of at most 100
///
/// # Arguments
///
/// * `steam_ids` - The IDs to batch
///
/// # Returns
///
/// `ceil(n / 100)` strings, each holding at most 100 comma-separated IDs
pub fn break_into_stacks_of_100_or_less(steam_ids: &[String]) -> Vec<String> {
    steam_ids
        .chunks(SUMMARY_BATCH_LIMIT)
        .map(|chunk| chunk.join(","))
        .collect()
}

/// Keeps only public profiles, preserving their relative order
pub fn public_profiles(players: Vec<Player>) -> Vec<Player> {
    players.into_iter().filter(Player::is_public).collect()
}

/// Fetches summaries for any number of SteamIDs, batching by 100
pub async fn fetch_summaries_batched(
    api: &dyn SteamApi,
    steam_ids: &[String],
) -> SteamResult<Vec<Player>> {
    let mut players = Vec::with_capacity(steam_ids.len());
    for batch in break_into_stacks_of_100_or_less(steam_ids) {
        players.extend(api.fetch_player_summaries(&batch).await?);
    }
    Ok(players)
}

/// Reports whether a profile hides its friend list
///
/// A hidden list answers 401 or 403; an empty list is treated the same way
/// because nothing can be crawled from it.
pub async fn is_profile_private(api: &dyn SteamApi, steam_id: &str) -> SteamResult<bool> {
    match api.fetch_friends(steam_id).await {
        Ok(friends) => Ok(friends.is_empty()),
        Err(SteamApiError::PrivateProfile(_)) => Ok(true),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ids(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| format!("{}", 76561197960265728u64 + i as u64))
            .collect()
    }

    fn player(steam_id: &str, visibility: u8) -> Player {
        Player {
            steam_id: steam_id.to_string(),
            community_visibility_state: visibility,
            persona_name: format!("name-{}", steam_id),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_valid_steam_id() {
        assert!(is_valid_steam_id("76561197960287930"));
        assert!(!is_valid_steam_id(""));
        assert!(!is_valid_steam_id("765611979602879301"));
        assert!(!is_valid_steam_id("7656119796028793a"));
        assert!(!is_valid_steam_id("-6561197960287930"));
    }

    #[test]
    fn test_filter_valid_steam_ids_drops_malformed() {
        let request = vec![
            "76561197960287930".to_string(),
            "bad".to_string(),
            " 76561197960287931 ".to_string(),
        ];
        let valid = filter_valid_steam_ids(&request).unwrap();
        assert_eq!(valid, vec!["76561197960287930", "76561197960287931"]);
    }

    #[test]
    fn test_filter_valid_steam_ids_none_valid() {
        let request = vec!["123".to_string(), "abc".to_string()];
        assert_eq!(
            filter_valid_steam_ids(&request),
            Err(ValidationError::NoValidSteamIds)
        );
        assert_eq!(
            filter_valid_steam_ids(&[]),
            Err(ValidationError::NoValidSteamIds)
        );
    }

    #[test]
    fn test_break_into_stacks_120() {
        let batches = break_into_stacks_of_100_or_less(&ids(120));
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].split(',').count(), 100);
        assert_eq!(batches[1].split(',').count(), 20);
    }

    #[test]
    fn test_break_into_stacks_1911() {
        let batches = break_into_stacks_of_100_or_less(&ids(1911));
        assert_eq!(batches.len(), 20);
        assert!(batches.iter().all(|b| b.split(',').count() <= 100));
        assert_eq!(batches[19].split(',').count(), 11);
    }

    #[test]
    fn test_break_into_stacks_edges() {
        assert!(break_into_stacks_of_100_or_less(&[]).is_empty());
        assert_eq!(break_into_stacks_of_100_or_less(&ids(100)).len(), 1);
        assert_eq!(break_into_stacks_of_100_or_less(&ids(101)).len(), 2);

        let single = break_into_stacks_of_100_or_less(&ids(1));
        assert_eq!(single, vec!["76561197960265728".to_string()]);
    }

    #[test]
    fn test_public_profiles_keeps_order() {
        let players = vec![
            player("1", 3),
            player("2", 1),
            player("3", 2),
            player("4", 3),
            player("5", 1),
            player("6", 3),
        ];

        let public: Vec<String> = public_profiles(players)
            .into_iter()
            .map(|p| p.steam_id)
            .collect();
        assert_eq!(public, vec!["1", "4", "6"]);
    }

    #[test]
    fn test_public_profiles_none_public() {
        let players = vec![player("1", 1), player("2", 2)];
        assert!(public_profiles(players).is_empty());
    }

    /// Answers every summary call with one public player per ID
    struct EchoApi {
        summary_calls: AtomicUsize,
    }

    #[async_trait]
    impl SteamApi for EchoApi {
        async fn fetch_friends(&self, steam_id: &str) -> SteamResult<Vec<String>> {
            Err(SteamApiError::PrivateProfile(steam_id.to_string()))
        }

        async fn fetch_owned_games(&self, _steam_id: &str) -> SteamResult<Vec<ApiOwnedGame>> {
            Ok(Vec::new())
        }

        async fn fetch_player_summaries(&self, comma_joined_ids: &str) -> SteamResult<Vec<Player>> {
            self.summary_calls.fetch_add(1, Ordering::SeqCst);
            Ok(comma_joined_ids.split(',').map(|id| player(id, 3)).collect())
        }
    }

    #[tokio::test]
    async fn test_resolve_usernames_batches_requests() {
        let api = EchoApi {
            summary_calls: AtomicUsize::new(0),
        };
        let steam_ids = ids(250);

        let names = api.resolve_usernames(&steam_ids).await.unwrap();
        assert_eq!(names.len(), 250);
        assert_eq!(api.summary_calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            names.get("76561197960265728").map(String::as_str),
            Some("name-76561197960265728")
        );
    }

    #[tokio::test]
    async fn test_fetch_summaries_batched() {
        let api = EchoApi {
            summary_calls: AtomicUsize::new(0),
        };
        let players = fetch_summaries_batched(&api, &ids(120)).await.unwrap();
        assert_eq!(players.len(), 120);
        assert_eq!(api.summary_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_hidden_friend_list_is_private() {
        let api = EchoApi {
            summary_calls: AtomicUsize::new(0),
        };
        assert!(is_profile_private(&api, "76561197960287930").await.unwrap());
    }
}
