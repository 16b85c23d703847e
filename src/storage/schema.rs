//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Steamgraph database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawled user; list columns hold JSON arrays
CREATE TABLE IF NOT EXISTS users (
    steam_id TEXT PRIMARY KEY,
    persona_name TEXT NOT NULL,
    profile_url TEXT NOT NULL,
    avatar TEXT NOT NULL,
    time_created INTEGER NOT NULL DEFAULT 0,
    loc_country_code TEXT NOT NULL,
    visibility_state INTEGER NOT NULL DEFAULT 0,
    friend_ids TEXT NOT NULL,
    games_owned TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Game catalogue
CREATE TABLE IF NOT EXISTS games (
    app_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    img_icon_url TEXT NOT NULL,
    img_logo_url TEXT NOT NULL
);

-- Per-crawl progress
CREATE TABLE IF NOT EXISTS crawl_statuses (
    crawl_id TEXT PRIMARY KEY,
    original_crawl_target TEXT NOT NULL,
    max_level INTEGER NOT NULL,
    total_users_to_crawl INTEGER NOT NULL,
    users_crawled INTEGER NOT NULL DEFAULT 0,
    time_started TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawl_statuses_target ON crawl_statuses(original_crawl_target);

-- Final graph artifacts, stored as JSON
CREATE TABLE IF NOT EXISTS processed_graphs (
    crawl_id TEXT PRIMARY KEY,
    graph_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
