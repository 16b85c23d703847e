//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the Steam Web API and run the
//! full cycle end-to-end: dispatch, worker pool, convergence and graph
//! creation.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use steamgraph::config::SteamApiConfig;
use steamgraph::context::CrawlSettings;
use steamgraph::crawler::{wait_until_finished, CrawlRequest};
use steamgraph::output::{export_graph, GraphExporter, JsonExporter};
use steamgraph::queue::InMemoryJobQueue;
use steamgraph::steam::SteamWebClient;
use steamgraph::{
    collect_graph_data, CrawlContext, CrawlDispatcher, CrawlWorkerPool, CrawlerError, DataStore,
    SqliteStore, ValidationError,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROOT: &str = "76561197960287930";
const FRIEND_A: &str = "76561197960265731";
const FRIEND_B: &str = "76561197960265732";

const FRIEND_LIST: &str = "/ISteamUser/GetFriendList/v0001/";
const OWNED_GAMES: &str = "/IPlayerService/GetOwnedGames/v0001/";
const SUMMARIES: &str = "/ISteamUser/GetPlayerSummaries/v0002/";

fn player(steam_id: &str, name: &str) -> Value {
    json!({
        "steamid": steam_id,
        "communityvisibilitystate": 3,
        "personaname": name,
        "profileurl": format!("https://steamcommunity.com/profiles/{}/", steam_id),
        "avatar": "",
        "timecreated": 1063407589
    })
}

fn games(list: &[(u32, &str, u64)]) -> Value {
    let games: Vec<Value> = list
        .iter()
        .map(|(app_id, name, playtime)| {
            json!({
                "appid": app_id,
                "name": name,
                "playtime_forever": playtime,
                "img_icon_url": format!("icon-{}", app_id),
                "img_logo_url": ""
            })
        })
        .collect();
    json!({ "response": { "game_count": games.len(), "games": games } })
}

fn friends(ids: &[&str]) -> Value {
    let friends: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "steamid": id, "relationship": "friend", "friend_since": 0 }))
        .collect();
    json!({ "friendslist": { "friends": friends } })
}

fn summaries(players: Vec<Value>) -> Value {
    json!({ "response": { "players": players } })
}

async fn mount(server: &MockServer, endpoint: &str, key: &str, value: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(query_param(key, value))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a root with two public friends whose own profiles carry no name
async fn mount_steam(server: &MockServer) {
    let both = format!("{},{}", FRIEND_A, FRIEND_B);

    mount(server, FRIEND_LIST, "steamid", ROOT, friends(&[FRIEND_A, FRIEND_B])).await;
    mount(server, FRIEND_LIST, "steamid", FRIEND_A, friends(&[ROOT])).await;
    mount(server, FRIEND_LIST, "steamid", FRIEND_B, friends(&[ROOT])).await;

    mount(
        server,
        OWNED_GAMES,
        "steamid",
        ROOT,
        games(&[(730, "Counter-Strike 2", 100), (570, "Dota 2", 50)]),
    )
    .await;
    mount(server, OWNED_GAMES, "steamid", FRIEND_A, games(&[(730, "Counter-Strike 2", 30)])).await;
    mount(server, OWNED_GAMES, "steamid", FRIEND_B, games(&[(440, "Team Fortress 2", 200)])).await;

    mount(server, SUMMARIES, "steamids", ROOT, summaries(vec![player(ROOT, "gaben")])).await;
    mount(server, SUMMARIES, "steamids", FRIEND_A, summaries(vec![player(FRIEND_A, "")])).await;
    mount(server, SUMMARIES, "steamids", FRIEND_B, summaries(vec![player(FRIEND_B, "")])).await;

    // The fan-out lookup sees no names yet; the later backfill lookup does
    Mock::given(method("GET"))
        .and(path(SUMMARIES))
        .and(query_param("steamids", both.as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(summaries(vec![player(FRIEND_A, ""), player(FRIEND_B, "")])),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
    mount(
        server,
        SUMMARIES,
        "steamids",
        &both,
        summaries(vec![player(FRIEND_A, "alice"), player(FRIEND_B, "bob")]),
    )
    .await;
}

fn create_test_context(base_url: &str) -> Arc<CrawlContext> {
    let steam = SteamWebClient::new(&SteamApiConfig {
        base_url: base_url.to_string(),
        api_key: "test-key".to_string(),
        request_timeout_secs: 5,
    })
    .expect("Failed to build Steam client");

    let settings = CrawlSettings {
        crawl_workers: 4,
        publish_retry_step: Duration::from_millis(1),
        graph_workers: 3,
        graph_job_capacity: 100,
        ..CrawlSettings::default()
    };

    Arc::new(CrawlContext::new(
        Arc::new(SqliteStore::new_in_memory().expect("Failed to open store")),
        Arc::new(steam),
        Arc::new(InMemoryJobQueue::new()),
        settings,
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_crawl_and_graph_creation() {
    let mock_server = MockServer::start().await;
    mount_steam(&mock_server).await;
    let ctx = create_test_context(&mock_server.uri());

    let cancel = CancellationToken::new();
    let pool = CrawlWorkerPool::new(Arc::clone(&ctx), ctx.settings.crawl_workers);
    let pool_handle = tokio::spawn({
        let cancel = cancel.clone();
        async move { pool.run(cancel).await }
    });

    let dispatcher = CrawlDispatcher::new(Arc::clone(&ctx));
    let started = dispatcher
        .crawl_users(&CrawlRequest {
            steam_ids: vec![ROOT.to_string()],
            level: 1,
        })
        .await
        .expect("Crawl request rejected");
    assert_eq!(started.len(), 1);
    let crawl_id = started[0].crawl_id.clone();

    let status = tokio::time::timeout(
        Duration::from_secs(20),
        wait_until_finished(ctx.store.as_ref(), &crawl_id, Duration::from_millis(20)),
    )
    .await
    .expect("Crawl did not converge")
    .expect("Crawl status missing");

    assert_eq!(status.max_level, 2);
    assert_eq!(status.total_users_to_crawl, 3);
    assert_eq!(status.users_crawled, 3);
    assert_eq!(
        dispatcher.has_been_crawled_before(ROOT, 1).await.unwrap(),
        Some(crawl_id.clone())
    );

    // Friend documents are stored without names
    let stored_a = ctx.store.fetch_user(FRIEND_A).await.unwrap().unwrap();
    assert!(stored_a.username().is_empty());

    let graph = collect_graph_data(&ctx, &crawl_id)
        .await
        .expect("Graph creation failed");

    cancel.cancel();
    pool_handle.await.unwrap().unwrap();

    assert_eq!(graph.user_details.user.steam_id(), ROOT);
    assert_eq!(graph.user_details.user.username(), "gaben");
    assert_eq!(graph.friend_details.len(), 2);

    let names: Vec<(&str, &str)> = graph
        .friend_details
        .iter()
        .map(|f| (f.user.steam_id(), f.user.username()))
        .collect();
    assert_eq!(names, vec![(FRIEND_A, "alice"), (FRIEND_B, "bob")]);
    assert!(graph.friend_details.iter().all(|f| f.current_level == 2));

    let top: Vec<(u32, &str, u64)> = graph
        .top_game_details
        .iter()
        .map(|g| (g.app_id, g.name.as_str(), g.total_playtime))
        .collect();
    assert_eq!(
        top,
        vec![
            (440, "Team Fortress 2", 200),
            (730, "Counter-Strike 2", 130),
            (570, "Dota 2", 50),
        ]
    );
    assert_eq!(graph.top_game_details[0].img_icon_url, "icon-440");

    // The stored artifact is the one returned, and it exports
    let stored = ctx.store.fetch_processed_graph(&crawl_id).await.unwrap();
    assert_eq!(stored.as_ref(), Some(&graph));

    let dir = tempfile::tempdir().unwrap();
    let json = JsonExporter::new(dir.path());
    let exporters: [&dyn GraphExporter; 1] = [&json];
    let written = export_graph(ctx.store.as_ref(), &crawl_id, &exporters)
        .await
        .unwrap();
    assert!(written[0].exists());
}

#[tokio::test]
async fn test_invalid_requests_are_rejected_before_enqueueing() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server.uri());
    let dispatcher = CrawlDispatcher::new(Arc::clone(&ctx));

    let err = dispatcher
        .crawl_users(&CrawlRequest {
            steam_ids: vec![ROOT.to_string()],
            level: 4,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CrawlerError::Validation(ValidationError::LevelOutOfRange { level: 4, max: 3 })
    ));

    let err = dispatcher
        .crawl_users(&CrawlRequest {
            steam_ids: vec!["not-a-steam-id".to_string(), "123".to_string()],
            level: 1,
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CrawlerError::Validation(ValidationError::NoValidSteamIds)
    ));
}

#[tokio::test]
async fn test_each_valid_target_gets_its_own_crawl() {
    let mock_server = MockServer::start().await;
    let ctx = create_test_context(&mock_server.uri());

    let started = CrawlDispatcher::new(Arc::clone(&ctx))
        .crawl_users(&CrawlRequest {
            steam_ids: vec![ROOT.to_string(), "bogus".to_string(), FRIEND_A.to_string()],
            level: 2,
        })
        .await
        .unwrap();

    assert_eq!(started.len(), 2);
    assert_ne!(started[0].crawl_id, started[1].crawl_id);

    for crawl in &started {
        let status = ctx
            .store
            .fetch_crawl_status(&crawl.crawl_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.original_crawl_target, crawl.steam_id);
        assert_eq!(status.max_level, 3);
        assert_eq!(status.total_users_to_crawl, 1);
        assert!(status.is_active());
    }
}
