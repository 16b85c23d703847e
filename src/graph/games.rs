//! Top-games aggregation
//!
//! Per-user lists are capped when users are saved and truncated again before
//! aggregation; the graph-wide ranking sums playtime across every user.

use crate::steam::ApiOwnedGame;
use crate::storage::{DataStore, OwnedGame, StorageResult, TopGame, UsersGraphInformation};
use std::collections::HashMap;

/// Most games kept on a saved user document
pub const MAX_GAMES_PER_USER: usize = 50;

/// Games per user that take part in the graph-wide ranking
pub const GAMES_PER_USER_FOR_RANKING: usize = 40;

/// Length of the graph-wide ranking
pub const TOP_GAMES_COUNT: usize = 10;

/// Sorts a user's games by playtime, most played first, and keeps at most 50
///
/// The sort is stable, so games with equal playtime keep their API order.
pub fn top_fifty_or_fewer_games(mut games: Vec<ApiOwnedGame>) -> Vec<ApiOwnedGame> {
    games.sort_by(|a, b| b.playtime_forever.cmp(&a.playtime_forever));
    games.truncate(MAX_GAMES_PER_USER);
    games
}

/// Keeps each user's 40 most played games
pub fn truncate_games_for_ranking(users: &mut [UsersGraphInformation]) {
    for info in users.iter_mut() {
        let games = &mut info.user.games_owned;
        games.sort_by(|a, b| b.playtime_forever.cmp(&a.playtime_forever));
        games.truncate(GAMES_PER_USER_FOR_RANKING);
    }
}

/// Ranks games by playtime summed across users
///
/// Ties keep the order in which a game was first seen.
///
/// # Returns
///
/// Up to `limit` `(app_id, total_playtime)` pairs, most played first
pub fn rank_games_by_playtime<'a, I>(games: I, limit: usize) -> Vec<(u32, u64)>
where
    I: IntoIterator<Item = &'a OwnedGame>,
{
    let mut totals: Vec<(u32, u64)> = Vec::new();
    let mut index: HashMap<u32, usize> = HashMap::new();

    for game in games {
        match index.get(&game.app_id) {
            Some(&i) => totals[i].1 += game.playtime_forever,
            None => {
                index.insert(game.app_id, totals.len());
                totals.push((game.app_id, game.playtime_forever));
            }
        }
    }

    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals.truncate(limit);
    totals
}

/// Builds the top ten games of a graph, labelled from the game catalogue
///
/// Games missing from the catalogue keep an empty name.
///
/// # Arguments
///
/// * `store` - Store holding the game catalogue
/// * `users` - Every user of the graph, root included
pub async fn top_ten_overall_games(
    store: &dyn DataStore,
    users: &[UsersGraphInformation],
) -> StorageResult<Vec<TopGame>> {
    let ranked = rank_games_by_playtime(
        users.iter().flat_map(|info| info.user.games_owned.iter()),
        TOP_GAMES_COUNT,
    );

    let app_ids: Vec<u32> = ranked.iter().map(|(app_id, _)| *app_id).collect();
    let details: HashMap<u32, _> = store
        .fetch_game_details(&app_ids)
        .await?
        .into_iter()
        .map(|game| (game.app_id, game))
        .collect();

    Ok(ranked
        .into_iter()
        .map(|(app_id, total_playtime)| {
            let info = details.get(&app_id);
            TopGame {
                app_id,
                name: info.map(|g| g.name.clone()).unwrap_or_default(),
                img_icon_url: info.map(|g| g.img_icon_url.clone()).unwrap_or_default(),
                img_logo_url: info.map(|g| g.img_logo_url.clone()).unwrap_or_default(),
                total_playtime,
            }
        })
        .collect())
}
