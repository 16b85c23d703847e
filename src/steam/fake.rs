//! Scripted `SteamApi` double for unit tests

use super::{ApiOwnedGame, Player, SteamApi, SteamApiError, SteamResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub(crate) struct ScriptedSteam {
    friends: HashMap<String, Vec<String>>,
    players: HashMap<String, Player>,
    games: HashMap<String, Vec<ApiOwnedGame>>,
    broken: HashSet<String>,
    pub friend_calls: AtomicUsize,
}

impl ScriptedSteam {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user with a friend list and `(app_id, playtime)` games
    pub fn user(
        mut self,
        steam_id: &str,
        visibility: u8,
        friends: &[&str],
        games: &[(u32, u64)],
    ) -> Self {
        self.players.insert(
            steam_id.to_string(),
            Player {
                steam_id: steam_id.to_string(),
                community_visibility_state: visibility,
                persona_name: format!("name-{}", &steam_id[steam_id.len() - 2..]),
                ..Default::default()
            },
        );
        self.friends.insert(
            steam_id.to_string(),
            friends.iter().map(|f| f.to_string()).collect(),
        );
        self.games.insert(
            steam_id.to_string(),
            games
                .iter()
                .map(|(app_id, playtime)| ApiOwnedGame {
                    app_id: *app_id,
                    name: format!("game-{}", app_id),
                    playtime_forever: *playtime,
                    ..Default::default()
                })
                .collect(),
        );
        self
    }

    /// Makes every friend list request for this user fail
    pub fn broken(mut self, steam_id: &str) -> Self {
        self.broken.insert(steam_id.to_string());
        self
    }

    pub fn friend_calls(&self) -> usize {
        self.friend_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SteamApi for ScriptedSteam {
    async fn fetch_friends(&self, steam_id: &str) -> SteamResult<Vec<String>> {
        self.friend_calls.fetch_add(1, Ordering::SeqCst);
        if self.broken.contains(steam_id) {
            return Err(SteamApiError::Status {
                status: 500,
                endpoint: "GetFriendList".to_string(),
            });
        }
        match self.players.get(steam_id) {
            Some(player) if !player.is_public() => {
                Err(SteamApiError::PrivateProfile(steam_id.to_string()))
            }
            _ => Ok(self.friends.get(steam_id).cloned().unwrap_or_default()),
        }
    }

    async fn fetch_owned_games(&self, steam_id: &str) -> SteamResult<Vec<ApiOwnedGame>> {
        Ok(self.games.get(steam_id).cloned().unwrap_or_default())
    }

    async fn fetch_player_summaries(&self, comma_joined_ids: &str) -> SteamResult<Vec<Player>> {
        Ok(comma_joined_ids
            .split(',')
            .filter_map(|id| self.players.get(id).cloned())
            .collect())
    }
}
