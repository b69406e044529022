//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 游戏记录仓库集成测试（内存实现与SQLite上的Sea-ORM实现）

#[path = "../common/mod.rs"]
mod common;

use common::{repositories, setup_logging, ts};
use gamesync::repository::{Comparator, FieldValue, GameField, GameQuery};
use gamesync::{GameRecord, SyncError, UpstreamGame};

fn game(name: &str, viewers: i64, secs: i64) -> GameRecord {
    let mut upstream = UpstreamGame::new(name, viewers, viewers / 10);
    upstream.box_template_url = Some(format!("https://img/{}-{{width}}x{{height}}.jpg", name));
    GameRecord::from_upstream(&upstream, ts(secs))
}

#[tokio::test]
async fn test_get_by_name_absent_is_not_an_error() {
    setup_logging();
    for (label, repo) in repositories().await {
        let found = repo.get_by_name("Nope").await.unwrap();
        assert!(found.is_none(), "{}", label);
    }
}

#[tokio::test]
async fn test_insert_then_update_by_identity() {
    setup_logging();
    for (label, repo) in repositories().await {
        let inserted = repo.upsert(game("Dota 2", 100, 1_000)).await.unwrap();
        let id = inserted.id.expect("identity assigned");

        let mut changed = repo.get_by_name("Dota 2").await.unwrap().unwrap();
        assert_eq!(changed.id, Some(id), "{}", label);
        changed.viewers = 5;
        changed.updated_at = ts(2_000);
        repo.upsert(changed).await.unwrap();

        let stored = repo.get_by_name("Dota 2").await.unwrap().unwrap();
        assert_eq!(stored.id, Some(id), "{}", label);
        assert_eq!(stored.viewers, 5, "{}", label);
        assert_eq!(stored.created_at, ts(1_000), "{}", label);
        assert_eq!(stored.updated_at, ts(2_000), "{}", label);
    }
}

#[tokio::test]
async fn test_query_top_orders_by_viewers_desc() {
    setup_logging();
    for (label, repo) in repositories().await {
        for (name, viewers) in [("A", 10), ("B", 300), ("C", 50), ("D", 7)] {
            repo.upsert(game(name, viewers, 1_000)).await.unwrap();
        }

        let top = repo.query_top(GameField::Viewers, 3).await.unwrap();
        let names: Vec<&str> = top.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A"], "{}", label);
    }
}

#[tokio::test]
async fn test_updated_at_filter_is_inclusive() {
    setup_logging();
    for (label, repo) in repositories().await {
        repo.upsert(game("old", 1, 880)).await.unwrap();
        repo.upsert(game("edge", 1, 940)).await.unwrap();
        repo.upsert(game("fresh", 1, 1_000)).await.unwrap();

        let mut idle: Vec<String> = repo
            .updated_at_or_before(ts(940))
            .await
            .unwrap()
            .into_iter()
            .map(|g| g.name)
            .collect();
        idle.sort();
        assert_eq!(idle, vec!["edge".to_string(), "old".to_string()], "{}", label);
    }
}

#[tokio::test]
async fn test_malformed_query_rejected() {
    setup_logging();
    for (label, repo) in repositories().await {
        let query = GameQuery::new().filter(
            GameField::Viewers,
            Comparator::Eq,
            FieldValue::Text("many".to_string()),
        );
        let err = repo.query(&query).await.unwrap_err();
        assert!(matches!(err, SyncError::MalformedInput(_)), "{}", label);
    }
}

#[tokio::test]
async fn test_duplicate_name_insert_rejected() {
    setup_logging();
    for (label, repo) in repositories().await {
        repo.upsert(game("Same", 1, 1_000)).await.unwrap();
        let result = repo.upsert(game("Same", 2, 1_000)).await;
        assert!(result.is_err(), "{}", label);
    }
}
