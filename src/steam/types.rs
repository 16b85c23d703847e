//! Wire types returned by the Steam Web API

use serde::{Deserialize, Serialize};

/// `communityvisibilitystate` value of a public profile
pub const PUBLIC_VISIBILITY_STATE: u8 = 3;

/// One player as returned by `ISteamUser/GetPlayerSummaries`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "steamid")]
    pub steam_id: String,

    /// 1 = private, 2 = friends only, 3 = public
    #[serde(rename = "communityvisibilitystate", default)]
    pub community_visibility_state: u8,

    #[serde(rename = "personaname", default)]
    pub persona_name: String,

    #[serde(rename = "profileurl", default)]
    pub profile_url: String,

    #[serde(default)]
    pub avatar: String,

    #[serde(rename = "timecreated", default)]
    pub time_created: i64,

    #[serde(rename = "loccountrycode", default)]
    pub loc_country_code: String,
}

impl Player {
    /// Returns true if the profile is visible to everyone
    pub fn is_public(&self) -> bool {
        self.community_visibility_state == PUBLIC_VISIBILITY_STATE
    }
}

/// One owned game as returned by `IPlayerService/GetOwnedGames`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiOwnedGame {
    #[serde(rename = "appid")]
    pub app_id: u32,

    #[serde(default)]
    pub name: String,

    /// Total playtime in minutes
    #[serde(default)]
    pub playtime_forever: u64,

    #[serde(default)]
    pub img_icon_url: String,

    #[serde(default)]
    pub img_logo_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendListEnvelope {
    #[serde(rename = "friendslist")]
    pub friends_list: FriendList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendList {
    #[serde(default)]
    pub friends: Vec<Friend>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Friend {
    #[serde(rename = "steamid")]
    pub steam_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedGamesEnvelope {
    pub response: OwnedGamesResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedGamesResponse {
    // Absent when the game details of the profile are hidden
    #[serde(default)]
    pub games: Vec<ApiOwnedGame>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesEnvelope {
    pub response: PlayerSummariesResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesResponse {
    #[serde(default)]
    pub players: Vec<Player>,
}
