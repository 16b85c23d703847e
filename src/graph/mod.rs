//! Graph creation for converged crawls
//!
//! This module turns the users persisted by a crawl into its final artifact:
//! - `GraphCollector` re-walks the crawl from the store
//! - The games helpers cap per-user game lists and rank the graph's top ten

mod collector;
mod games;

pub use collector::GraphCollector;
pub use games::{
    rank_games_by_playtime, top_fifty_or_fewer_games, top_ten_overall_games,
    truncate_games_for_ranking, GAMES_PER_USER_FOR_RANKING, MAX_GAMES_PER_USER, TOP_GAMES_COUNT,
};
pub use crate::storage::{TopGame, UsersGraphData, UsersGraphInformation};

use crate::context::CrawlContext;
use crate::{CrawlerError, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Builds and persists the graph of a crawl
///
/// Collects every user of the crawl, ranks the graph's most played games and
/// stores the result. A graph is only ever stored once per crawl.
///
/// # Arguments
///
/// * `ctx` - Shared crawl context
/// * `crawl_id` - The crawl to build the graph for
///
/// # Returns
///
/// * `Ok(UsersGraphData)` - The persisted graph
/// * `Err(CrawlerError::CrawlNotFound)` - The crawl has no status record
/// * `Err(CrawlerError::GraphCollection)` - Collection or persistence failed;
///   the graph has to be requested again
pub async fn collect_graph_data(ctx: &CrawlContext, crawl_id: &str) -> Result<UsersGraphData> {
    let status = ctx
        .store
        .fetch_crawl_status(crawl_id)
        .await?
        .ok_or_else(|| CrawlerError::CrawlNotFound(crawl_id.to_string()))?;

    if status.is_active() {
        warn!(
            crawl_id,
            crawled = status.users_crawled,
            total = status.total_users_to_crawl,
            "Building the graph of a crawl that has not finished"
        );
    }

    let collector = GraphCollector::new(
        Arc::clone(&ctx.store),
        Arc::clone(&ctx.steam),
        ctx.settings.graph_workers,
        ctx.settings.graph_job_capacity,
    );
    let mut users = collector.collect(&status).await?;

    let fail = |message: String| CrawlerError::GraphCollection {
        crawl_id: crawl_id.to_string(),
        message,
    };

    truncate_games_for_ranking(&mut users);
    let top_game_details = top_ten_overall_games(ctx.store.as_ref(), &users)
        .await
        .map_err(|e| fail(format!("could not rank games: {}", e)))?;

    let mut users = users.into_iter();
    let user_details = users
        .next()
        .ok_or_else(|| fail("graph has no root user".to_string()))?;
    let graph = UsersGraphData {
        user_details,
        friend_details: users.collect(),
        top_game_details,
    };

    match ctx.store.save_processed_graph(crawl_id, &graph).await {
        Ok(true) => {}
        Ok(false) => return Err(fail("a graph was already stored for this crawl".to_string())),
        Err(e) => return Err(fail(format!("could not store graph: {}", e))),
    }

    ctx.sessions.forget(crawl_id);
    ctx.progress.release(crawl_id);

    info!(
        crawl_id,
        friends = graph.friend_details.len(),
        top_games = graph.top_game_details.len(),
        "Graph stored"
    );
    Ok(graph)
}
