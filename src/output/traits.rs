//! Exporter trait and the summary derived from a processed graph

use crate::storage::{TopGame, UsersGraphData};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode graph: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No graph stored for crawl {0}")]
    GraphNotFound(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes a processed graph somewhere a person can read it
pub trait GraphExporter {
    /// Exports one crawl's graph
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Where the export was written
    /// * `Err(OutputError)` - The export could not be written
    fn export(&self, crawl_id: &str, graph: &UsersGraphData) -> OutputResult<PathBuf>;
}

/// Headline numbers of a processed graph
#[derive(Debug, Clone, Default)]
pub struct GraphSummary {
    pub crawl_id: String,
    pub root_steam_id: String,
    pub root_username: String,
    /// Every user in the graph, root included
    pub total_users: usize,
    /// Number of users reached at each level
    pub users_per_level: BTreeMap<u32, usize>,
    pub top_games: Vec<TopGame>,
}

impl GraphSummary {
    pub fn from_graph(crawl_id: &str, graph: &UsersGraphData) -> Self {
        let mut users_per_level = BTreeMap::new();
        for info in std::iter::once(&graph.user_details).chain(graph.friend_details.iter()) {
            *users_per_level.entry(info.current_level).or_insert(0) += 1;
        }

        Self {
            crawl_id: crawl_id.to_string(),
            root_steam_id: graph.user_details.user.steam_id().to_string(),
            root_username: graph.user_details.user.username().to_string(),
            total_users: graph.friend_details.len() + 1,
            users_per_level,
            top_games: graph.top_game_details.clone(),
        }
    }

    /// Summed playtime of the top games, in hours
    pub fn top_games_hours(&self) -> f64 {
        self.top_games.iter().map(|g| g.total_playtime).sum::<u64>() as f64 / 60.0
    }
}
