//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 对账引擎集成测试

#[path = "../common/mod.rs"]
mod common;

use common::{repositories, setup_logging, ts, FailingRepository};
use gamesync::repository::{GameQuery, GameRepository, InMemoryGameRepository};
use gamesync::sync::{FailureKind, FanOut, ReconciliationEngine};
use gamesync::UpstreamGame;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn snapshot(n: usize) -> Vec<UpstreamGame> {
    (0..n)
        .map(|i| {
            let mut game = UpstreamGame::new(format!("game-{}", i), 1_000 - i as i64, 10);
            game.external_id = i as i64;
            game.box_template_url = Some(format!("box-{}", i));
            game.popularity = Some(i as i64);
            game
        })
        .collect()
}

fn engine(repo: Arc<dyn GameRepository>) -> ReconciliationEngine {
    ReconciliationEngine::new(repo, FanOut::new(4, Duration::from_secs(10)))
}

#[tokio::test]
async fn test_every_entity_emitted_once_with_sync_timestamp() {
    setup_logging();
    let repo = Arc::new(InMemoryGameRepository::new());
    let engine = engine(repo.clone());
    let t = ts(10_000);

    let (mut stream, skipped) = engine.start(snapshot(25), t);
    assert_eq!(skipped, 0);

    let mut names = HashSet::new();
    while let Some(record) = stream.next().await {
        assert_eq!(record.updated_at, t);
        assert!(record.id.is_some());
        assert!(names.insert(record.name.clone()), "emitted twice: {}", record.name);
    }
    assert_eq!(names.len(), 25);

    let report = stream.report().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(repo.len(), 25);

    for game in snapshot(25) {
        let stored = repo.get_by_name(&game.name).await.unwrap().unwrap();
        assert_eq!(stored.viewers, game.viewers);
        assert_eq!(stored.external_id, game.external_id);
        assert_eq!(Some(stored.box_template_url), game.box_template_url);
        assert_eq!(stored.created_at, t);
    }
}

#[tokio::test]
async fn test_second_pass_updates_in_place() {
    setup_logging();
    for (label, repo) in repositories().await {
        let engine = engine(repo.clone());
        let (t1, t2) = (ts(10_000), ts(20_000));

        engine
            .reconcile(vec![UpstreamGame::new("Go", 5, 1)], t1)
            .await
            .unwrap();
        let first = repo.get_by_name("Go").await.unwrap().unwrap();

        let report = engine
            .reconcile(vec![UpstreamGame::new("Go", 50, 3)], t2)
            .await
            .unwrap();
        assert_eq!(report.persisted(), 1, "{}", label);

        let all = repo.query(&GameQuery::new()).await.unwrap();
        assert_eq!(all.len(), 1, "{}", label);
        let second = repo.get_by_name("Go").await.unwrap().unwrap();
        assert_eq!(second.id, first.id, "{}", label);
        assert_eq!(second.created_at, t1, "{}", label);
        assert_eq!(second.updated_at, t2, "{}", label);
        assert_eq!((second.viewers, second.channels), (50, 3), "{}", label);
    }
}

#[tokio::test]
async fn test_one_failure_does_not_block_fan_in() {
    setup_logging();
    let repo = Arc::new(FailingRepository::new(&["game-3"]).with_delay(Duration::from_millis(2)));
    let engine = engine(repo.clone());

    let (mut stream, _) = engine.start(snapshot(10), ts(10_000));
    let mut emitted = 0;
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while stream.next().await.is_some() {
            emitted += 1;
        }
    })
    .await;
    assert!(drained.is_ok(), "result stream never closed");
    assert_eq!(emitted, 9);

    let report = stream.report().await.unwrap();
    assert_eq!(report.succeeded(), 9);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].key, "game-3");
    assert_eq!(report.failures[0].kind, FailureKind::Persistence);
    assert_eq!(repo.inner.len(), 9);
}

#[tokio::test]
async fn test_all_failures_are_aggregated() {
    setup_logging();
    let repo = Arc::new(FailingRepository::new(&["game-0", "game-1", "game-2"]));
    let report = engine(repo).reconcile(snapshot(3), ts(1)).await.unwrap();

    assert_eq!(report.persisted(), 0);
    let mut keys: Vec<String> = report.pass.failures.iter().map(|f| f.key.clone()).collect();
    keys.sort();
    assert_eq!(keys, vec!["game-0", "game-1", "game-2"]);
}

#[tokio::test]
async fn test_duplicate_names_keep_first_occurrence() {
    setup_logging();
    let repo = Arc::new(InMemoryGameRepository::new());
    let snapshot = vec![
        UpstreamGame::new("Dup", 900, 9),
        UpstreamGame::new("Other", 10, 1),
        UpstreamGame::new("Dup", 1, 1),
    ];

    let report = engine(repo.clone()).reconcile(snapshot, ts(5)).await.unwrap();

    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(report.persisted(), 2);
    assert_eq!(repo.get_by_name("Dup").await.unwrap().unwrap().viewers, 900);
}

#[tokio::test]
async fn test_empty_snapshot_closes_immediately() {
    setup_logging();
    let repo = Arc::new(InMemoryGameRepository::new());
    let (mut stream, _) = engine(repo).start(Vec::new(), ts(1));

    assert!(stream.next().await.is_none());
    let report = stream.report().await.unwrap();
    assert_eq!(report.succeeded() + report.failed(), 0);
}
