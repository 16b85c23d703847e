//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the DataStore trait.
//! rusqlite is synchronous, so every statement runs on tokio's blocking pool
//! and the async methods only await its result.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{DataStore, StorageError, StorageResult};
use crate::storage::{
    AccountDetails, CrawlingStatus, GameInfo, OwnedGame, UserDocument, UsersGraphData,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite storage backend
///
/// The connection sits behind a mutex so one store can be shared by every
/// crawl worker. The mutex is only ever taken inside a blocking task.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StorageError::Database(format!("storage task failed: {}", e)))?
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp '{}': {}", value, e)))
}

#[async_trait]
impl DataStore for SqliteStore {
    // ===== Users =====

    async fn fetch_user(&self, steam_id: &str) -> StorageResult<Option<UserDocument>> {
        let steam_id = steam_id.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT steam_id, persona_name, profile_url, avatar, time_created,
                                loc_country_code, visibility_state, friend_ids, games_owned
                         FROM users WHERE steam_id = ?1",
                        params![steam_id],
                        |row| {
                            Ok((
                                AccountDetails {
                                    steam_id: row.get(0)?,
                                    persona_name: row.get(1)?,
                                    profile_url: row.get(2)?,
                                    avatar: row.get(3)?,
                                    time_created: row.get(4)?,
                                    loc_country_code: row.get(5)?,
                                    visibility_state: row.get(6)?,
                                },
                                row.get::<_, String>(7)?,
                                row.get::<_, String>(8)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        let Some((account, friend_ids, games_owned)) = row else {
            return Ok(None);
        };

        Ok(Some(UserDocument {
            account,
            friend_ids: serde_json::from_str(&friend_ids)?,
            games_owned: serde_json::from_str::<Vec<OwnedGame>>(&games_owned)?,
        }))
    }

    async fn save_user(&self, user: &UserDocument) -> StorageResult<()> {
        let friend_ids = serde_json::to_string(&user.friend_ids)?;
        let games_owned = serde_json::to_string(&user.games_owned)?;
        let account = user.account.clone();
        let now = Utc::now().to_rfc3339();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO users
                    (steam_id, persona_name, profile_url, avatar, time_created,
                     loc_country_code, visibility_state, friend_ids, games_owned, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    account.steam_id,
                    account.persona_name,
                    account.profile_url,
                    account.avatar,
                    account.time_created,
                    account.loc_country_code,
                    account.visibility_state,
                    friend_ids,
                    games_owned,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
    }

    // ===== Games =====

    async fn save_games(&self, games: &[GameInfo]) -> StorageResult<()> {
        if games.is_empty() {
            return Ok(());
        }

        let games = games.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO games (app_id, name, img_icon_url, img_logo_url)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for game in &games {
                    stmt.execute(params![
                        game.app_id,
                        game.name,
                        game.img_icon_url,
                        game.img_logo_url
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn fetch_game_details(&self, app_ids: &[u32]) -> StorageResult<Vec<GameInfo>> {
        let app_ids = app_ids.to_vec();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT app_id, name, img_icon_url, img_logo_url FROM games WHERE app_id = ?1",
            )?;

            let mut found = Vec::with_capacity(app_ids.len());
            for app_id in &app_ids {
                let game = stmt
                    .query_row(params![app_id], |row| {
                        Ok(GameInfo {
                            app_id: row.get(0)?,
                            name: row.get(1)?,
                            img_icon_url: row.get(2)?,
                            img_logo_url: row.get(3)?,
                        })
                    })
                    .optional()?;
                if let Some(game) = game {
                    found.push(game);
                }
            }
            Ok(found)
        })
        .await
    }

    // ===== Crawl status =====

    async fn fetch_crawl_status(&self, crawl_id: &str) -> StorageResult<Option<CrawlingStatus>> {
        let crawl_id = crawl_id.to_string();
        let row = self
            .with_conn(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT crawl_id, original_crawl_target, max_level, total_users_to_crawl,
                                users_crawled, time_started
                         FROM crawl_statuses WHERE crawl_id = ?1",
                        params![crawl_id],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, u32>(2)?,
                                row.get::<_, i64>(3)?,
                                row.get::<_, i64>(4)?,
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        let Some((crawl_id, target, max_level, total, crawled, started)) = row else {
            return Ok(None);
        };

        Ok(Some(CrawlingStatus {
            crawl_id,
            original_crawl_target: target,
            max_level,
            total_users_to_crawl: total,
            users_crawled: crawled,
            time_started: parse_timestamp(&started)?,
        }))
    }

    async fn update_crawl_status(
        &self,
        crawl_id: &str,
        current_level: u32,
        delta: &CrawlingStatus,
    ) -> StorageResult<bool> {
        let crawl_id = crawl_id.to_string();
        let scheduled = delta.total_users_to_crawl;
        let crawled = delta.users_crawled;

        self.with_conn(move |conn| {
            // SQLite evaluates every right-hand side against the old row, so the
            // crawled counter is capped by the total after this same update.
            let changed = conn.execute(
                "UPDATE crawl_statuses
                 SET total_users_to_crawl = total_users_to_crawl
                         + (CASE WHEN ?2 < max_level THEN ?3 ELSE 0 END),
                     users_crawled = MIN(
                         users_crawled + ?4,
                         total_users_to_crawl + (CASE WHEN ?2 < max_level THEN ?3 ELSE 0 END)
                     )
                 WHERE crawl_id = ?1",
                params![crawl_id, current_level, scheduled, crawled],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn insert_crawl_status(&self, status: &CrawlingStatus) -> StorageResult<()> {
        let status = status.clone();
        self.with_conn(move |conn| {
            let result = conn.execute(
                "INSERT INTO crawl_statuses
                    (crawl_id, original_crawl_target, max_level, total_users_to_crawl,
                     users_crawled, time_started)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    status.crawl_id,
                    status.original_crawl_target,
                    status.max_level,
                    status.total_users_to_crawl,
                    status.users_crawled,
                    status.time_started.to_rfc3339(),
                ],
            );

            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(StorageError::ConstraintViolation(format!(
                        "crawl status {} already exists",
                        status.crawl_id
                    )))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn has_been_crawled_before(
        &self,
        steam_id: &str,
        level: u32,
    ) -> StorageResult<Option<String>> {
        let steam_id = steam_id.to_string();
        let max_level = level + 1;

        self.with_conn(move |conn| {
            let crawl_id: Option<String> = conn
                .query_row(
                    "SELECT crawl_id FROM crawl_statuses
                     WHERE original_crawl_target = ?1
                       AND max_level = ?2
                       AND total_users_to_crawl != 0
                       AND users_crawled >= total_users_to_crawl
                     ORDER BY time_started DESC
                     LIMIT 1",
                    params![steam_id, max_level],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(crawl_id)
        })
        .await
    }

    // ===== Processed graphs =====

    async fn save_processed_graph(
        &self,
        crawl_id: &str,
        graph: &UsersGraphData,
    ) -> StorageResult<bool> {
        let graph_json = serde_json::to_string(graph)?;
        let crawl_id = crawl_id.to_string();
        let now = Utc::now().to_rfc3339();

        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO processed_graphs (crawl_id, graph_json, created_at)
                 VALUES (?1, ?2, ?3)",
                params![crawl_id, graph_json, now],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    async fn fetch_processed_graph(&self, crawl_id: &str) -> StorageResult<Option<UsersGraphData>> {
        let crawl_id = crawl_id.to_string();
        let graph_json: Option<String> = self
            .with_conn(move |conn| {
                let graph_json = conn
                    .query_row(
                        "SELECT graph_json FROM processed_graphs WHERE crawl_id = ?1",
                        params![crawl_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(graph_json)
            })
            .await?;

        match graph_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{TopGame, UsersGraphInformation};
    use std::sync::Arc;

    fn user(steam_id: &str, friends: &[&str]) -> UserDocument {
        UserDocument {
            account: AccountDetails {
                steam_id: steam_id.to_string(),
                persona_name: format!("user-{}", steam_id),
                ..Default::default()
            },
            friend_ids: friends.iter().map(|f| f.to_string()).collect(),
            games_owned: vec![
                OwnedGame {
                    app_id: 10,
                    playtime_forever: 120,
                },
                OwnedGame {
                    app_id: 440,
                    playtime_forever: 30,
                },
            ],
        }
    }

    fn status(crawl_id: &str, max_level: u32, total: i64, crawled: i64) -> CrawlingStatus {
        CrawlingStatus {
            crawl_id: crawl_id.to_string(),
            original_crawl_target: "76561197960287930".to_string(),
            max_level,
            total_users_to_crawl: total,
            users_crawled: crawled,
            time_started: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_user_roundtrip_and_missing() {
        let store = SqliteStore::new_in_memory().unwrap();
        assert!(store.fetch_user("1").await.unwrap().is_none());

        let doc = user("1", &["2", "3"]);
        store.save_user(&doc).await.unwrap();
        assert_eq!(store.fetch_user("1").await.unwrap(), Some(doc));
    }

    #[tokio::test]
    async fn test_save_user_replaces() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.save_user(&user("1", &["2"])).await.unwrap();
        store.save_user(&user("1", &["2", "3", "4"])).await.unwrap();

        let fetched = store.fetch_user("1").await.unwrap().unwrap();
        assert_eq!(fetched.friend_ids.len(), 3);
    }

    #[tokio::test]
    async fn test_game_details_skip_unknown() {
        let store = SqliteStore::new_in_memory().unwrap();
        store
            .save_games(&[
                GameInfo {
                    app_id: 10,
                    name: "Counter-Strike".to_string(),
                    ..Default::default()
                },
                GameInfo {
                    app_id: 440,
                    name: "Team Fortress 2".to_string(),
                    ..Default::default()
                },
            ])
            .await
            .unwrap();

        let games = store.fetch_game_details(&[440, 999, 10]).await.unwrap();
        let names: Vec<&str> = games.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Team Fortress 2", "Counter-Strike"]);
    }

    #[tokio::test]
    async fn test_update_missing_status_reports_false() {
        let store = SqliteStore::new_in_memory().unwrap();
        let updated = store
            .update_crawl_status("nope", 1, &status("nope", 2, 1, 1))
            .await
            .unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_update_applies_deltas_by_level() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_crawl_status(&status("c", 3, 1, 0)).await.unwrap();

        // Root at level 1 schedules 4 friends
        assert!(store
            .update_crawl_status("c", 1, &status("c", 3, 4, 1))
            .await
            .unwrap());
        // A deepest-level user never grows the total
        assert!(store
            .update_crawl_status("c", 3, &status("c", 3, 7, 1))
            .await
            .unwrap());

        let stored = store.fetch_crawl_status("c").await.unwrap().unwrap();
        assert_eq!(stored.total_users_to_crawl, 5);
        assert_eq!(stored.users_crawled, 2);
        assert_eq!(stored.max_level, 3);
    }

    #[tokio::test]
    async fn test_crawled_never_exceeds_total() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_crawl_status(&status("c", 2, 2, 0)).await.unwrap();

        for _ in 0..5 {
            store
                .update_crawl_status("c", 2, &status("c", 2, 0, 1))
                .await
                .unwrap();
        }

        let stored = store.fetch_crawl_status("c").await.unwrap().unwrap();
        assert_eq!(stored.users_crawled, 2);
        assert!(stored.is_finished());
    }

    #[tokio::test]
    async fn test_concurrent_updates_lose_nothing() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        store
            .insert_crawl_status(&status("c", 2, 64, 0))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    store
                        .update_crawl_status("c", 2, &status("c", 2, 0, 1))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 80 increments against a cap of 64
        let stored = store.fetch_crawl_status("c").await.unwrap().unwrap();
        assert_eq!(stored.users_crawled, 64);
    }

    #[tokio::test]
    async fn test_duplicate_status_insert_is_constraint_violation() {
        let store = SqliteStore::new_in_memory().unwrap();
        store.insert_crawl_status(&status("c", 2, 1, 0)).await.unwrap();
        let result = store.insert_crawl_status(&status("c", 2, 1, 0)).await;
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_has_been_crawled_before_needs_finished_crawl_at_level() {
        let store = SqliteStore::new_in_memory().unwrap();
        let target = "76561197960287930";
        assert_eq!(store.has_been_crawled_before(target, 1).await.unwrap(), None);

        // Still running, and finished at another level
        store.insert_crawl_status(&status("running", 2, 3, 1)).await.unwrap();
        store.insert_crawl_status(&status("deeper", 3, 5, 5)).await.unwrap();
        assert_eq!(store.has_been_crawled_before(target, 1).await.unwrap(), None);

        store.insert_crawl_status(&status("done", 2, 3, 3)).await.unwrap();
        assert_eq!(
            store.has_been_crawled_before(target, 1).await.unwrap(),
            Some("done".to_string())
        );
        assert_eq!(
            store.has_been_crawled_before(target, 2).await.unwrap(),
            Some("deeper".to_string())
        );
        assert_eq!(
            store
                .has_been_crawled_before("76561197960265731", 1)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_latest_finished_crawl_is_reported() {
        let store = SqliteStore::new_in_memory().unwrap();
        let mut older = status("older", 2, 3, 3);
        older.time_started = Utc::now() - chrono::Duration::hours(1);
        store.insert_crawl_status(&older).await.unwrap();
        store.insert_crawl_status(&status("newer", 2, 4, 4)).await.unwrap();

        assert_eq!(
            store
                .has_been_crawled_before("76561197960287930", 1)
                .await
                .unwrap(),
            Some("newer".to_string())
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_statements_leave_runtime_free() {
        let store = Arc::new(SqliteStore::new_in_memory().unwrap());
        store.insert_crawl_status(&status("c", 2, 1000, 0)).await.unwrap();

        // A ticker shares the single runtime thread with the writes
        let ticks = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = Arc::clone(&ticks);
            async move {
                loop {
                    ticks.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            }
        });

        for _ in 0..20 {
            store
                .update_crawl_status("c", 2, &status("c", 2, 0, 1))
                .await
                .unwrap();
        }
        ticker.abort();

        assert!(ticks.load(std::sync::atomic::Ordering::SeqCst) > 0);
        let stored = store.fetch_crawl_status("c").await.unwrap().unwrap();
        assert_eq!(stored.users_crawled, 20);
    }

    #[tokio::test]
    async fn test_processed_graph_saved_once() {
        let store = SqliteStore::new_in_memory().unwrap();
        let graph = UsersGraphData {
            user_details: UsersGraphInformation {
                user: user("1", &["2"]),
                from_id: "1".to_string(),
                current_level: 1,
                max_level: 2,
            },
            friend_details: vec![UsersGraphInformation {
                user: user("2", &[]),
                from_id: "1".to_string(),
                current_level: 2,
                max_level: 2,
            }],
            top_game_details: vec![TopGame {
                app_id: 10,
                name: "Counter-Strike".to_string(),
                img_icon_url: String::new(),
                img_logo_url: String::new(),
                total_playtime: 240,
            }],
        };

        assert!(store.save_processed_graph("c", &graph).await.unwrap());
        assert!(!store.save_processed_graph("c", &graph).await.unwrap());
        assert_eq!(store.fetch_processed_graph("c").await.unwrap(), Some(graph));
        assert!(store.fetch_processed_graph("other").await.unwrap().is_none());
    }
}
