//! reqwest-backed Steam Web API client

use super::types::{
    ApiOwnedGame, FriendListEnvelope, OwnedGamesEnvelope, Player, PlayerSummariesEnvelope,
};
use super::{SteamApi, SteamApiError, SteamResult};
use crate::config::SteamApiConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const FRIEND_LIST_PATH: &str = "ISteamUser/GetFriendList/v0001/";
const OWNED_GAMES_PATH: &str = "IPlayerService/GetOwnedGames/v0001/";
const PLAYER_SUMMARIES_PATH: &str = "ISteamUser/GetPlayerSummaries/v0002/";

/// Builds an HTTP client configured for the Steam Web API
///
/// # Arguments
///
/// * `config` - The Steam API configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &SteamApiConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("steamgraph/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Steam Web API client
#[derive(Debug, Clone)]
pub struct SteamWebClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl SteamWebClient {
    /// Creates a client from configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The Steam API configuration (api key already resolved)
    ///
    /// # Returns
    ///
    /// * `Ok(SteamWebClient)` - Client ready to issue requests
    /// * `Err(SteamApiError)` - The base URL is invalid or the HTTP client failed to build
    pub fn new(config: &SteamApiConfig) -> SteamResult<Self> {
        let client = build_http_client(config)?;

        // A trailing slash makes `join` append instead of replacing the last segment
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_key: config.api_key.clone(),
        })
    }

    /// Issues a GET against an API path and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> SteamResult<T> {
        let url = self.base_url.join(path)?;
        trace!(endpoint = path, "Steam API request");

        let response = self
            .client
            .get(url)
            .query(&[("key", self.api_key.as_str()), ("format", "json")])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SteamApiError::Status {
                status: status.as_u16(),
                endpoint: path.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| SteamApiError::Decode {
            endpoint: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl SteamApi for SteamWebClient {
    async fn fetch_friends(&self, steam_id: &str) -> SteamResult<Vec<String>> {
        let result: SteamResult<FriendListEnvelope> = self
            .get_json(
                FRIEND_LIST_PATH,
                &[("steamid", steam_id), ("relationship", "friend")],
            )
            .await;

        match result {
            Ok(envelope) => {
                let friends: Vec<String> = envelope
                    .friends_list
                    .friends
                    .into_iter()
                    .map(|f| f.steam_id)
                    .collect();
                debug!(steam_id, count = friends.len(), "Fetched friend list");
                Ok(friends)
            }
            // The friend list of a private profile answers 401
            Err(SteamApiError::Status { status, .. })
                if status == StatusCode::UNAUTHORIZED.as_u16()
                    || status == StatusCode::FORBIDDEN.as_u16() =>
            {
                Err(SteamApiError::PrivateProfile(steam_id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_owned_games(&self, steam_id: &str) -> SteamResult<Vec<ApiOwnedGame>> {
        let envelope: OwnedGamesEnvelope = self
            .get_json(
                OWNED_GAMES_PATH,
                &[
                    ("steamid", steam_id),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;

        debug!(
            steam_id,
            count = envelope.response.games.len(),
            "Fetched owned games"
        );
        Ok(envelope.response.games)
    }

    async fn fetch_player_summaries(&self, comma_joined_ids: &str) -> SteamResult<Vec<Player>> {
        let envelope: PlayerSummariesEnvelope = self
            .get_json(PLAYER_SUMMARIES_PATH, &[("steamids", comma_joined_ids)])
            .await?;
        Ok(envelope.response.players)
    }
}
