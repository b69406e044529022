//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 同步流水线集成测试

#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use common::{setup_logging, ts, FailingRepository};
use gamesync::backend::{CacheBackend, MemoryBackend};
use gamesync::config::CacheBackendType;
use gamesync::error::Result;
use gamesync::listing::TOP_GAMES_KEY;
use gamesync::repository::{GameRepository, InMemoryGameRepository};
use gamesync::upstream::{ListOptions, Pagination, UpstreamClient};
use gamesync::{
    Config, GameRecord, GameSyncService, PipelineStage, StreamSummary, SyncError, UpstreamGame,
};
use mockall::mock;
use serde_json::Value;
use std::sync::Arc;

mock! {
    pub Upstream {}

    #[async_trait]
    impl UpstreamClient for Upstream {
        async fn list_top(&self, options: ListOptions) -> Result<(Vec<UpstreamGame>, Pagination)>;
        async fn list_streams(&self, game: &str) -> Result<Vec<StreamSummary>>;
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.cache.backend = CacheBackendType::Memory;
    config.upstream.requests_per_second = 1_000;
    config.sync.worker_pool_size = 4;
    config
}

fn page(names: &[(&str, i64)]) -> Vec<UpstreamGame> {
    names
        .iter()
        .map(|(name, viewers)| {
            let mut game = UpstreamGame::new(*name, *viewers, 1);
            game.box_template_url = Some(format!("box/{}", name));
            game
        })
        .collect()
}

fn service(
    config: &Config,
    repo: Arc<dyn GameRepository>,
    upstream: MockUpstream,
) -> (GameSyncService, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new(64));
    let service = GameSyncService::assemble(config, backend.clone(), repo, Arc::new(upstream));
    (service, backend)
}

fn names_in(body: &str) -> Vec<String> {
    let parsed: Value = serde_json::from_str(body).unwrap();
    parsed
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_full_run_serves_fresh_top_games() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream.expect_list_top().times(1).returning(|options| {
        assert_eq!(options.offset, 0);
        Ok((
            page(&[("Dota 2", 300), ("Go", 10), ("Chess", 120)]),
            Pagination {
                next_offset: Some(3),
                total: Some(500),
            },
        ))
    });

    let repo = Arc::new(InMemoryGameRepository::new());
    let (service, _) = service(&test_config(), repo.clone(), upstream);
    let report = service.pipeline().run_at(ts(50_000)).await.unwrap();

    assert_eq!(
        report.stages,
        vec![
            PipelineStage::FetchUpstream,
            PipelineStage::Reconcile,
            PipelineStage::ResetIdle,
            PipelineStage::InvalidateCache,
            PipelineStage::ServeFromCache,
        ]
    );
    assert_eq!(report.reconcile.persisted(), 3);
    assert_eq!(report.reset.as_ref().map(|r| r.succeeded()), Some(0));

    let body = report.listing.body().unwrap();
    assert_eq!(names_in(body), vec!["Dota 2", "Chess", "Go"]);
    assert!(body.contains("\"boxTemplateURL\":\"box/Dota 2\""));
    assert!(report.listing.cache_control.is_some());
}

#[tokio::test]
async fn test_pipeline_invalidates_stale_listing() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_list_top()
        .returning(|_| Ok((page(&[("New", 999)]), Pagination::default())));

    let repo = Arc::new(InMemoryGameRepository::new());
    repo.upsert(GameRecord::from_upstream(&UpstreamGame::new("Old", 5, 1), ts(1)))
        .await
        .unwrap();

    let (service, _) = service(&test_config(), repo, upstream);
    let before = service.listings().top_games().await.unwrap();
    assert_eq!(names_in(before.body().unwrap()), vec!["Old"]);

    let report = service.pipeline().run_at(ts(50_000)).await.unwrap();
    assert_eq!(names_in(report.listing.body().unwrap()), vec!["New", "Old"]);

    // "Old" 已超出空闲窗口，计数器被清零
    let reset = report.reset.unwrap();
    assert_eq!(reset.succeeded(), 1);
    assert_eq!(reset.successes[0].name, "Old");
    assert_eq!(reset.successes[0].viewers, 0);
}

#[tokio::test]
async fn test_upstream_failure_aborts_before_reconcile() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_list_top()
        .returning(|_| Err(SyncError::UpstreamFetch("503 from upstream".to_string())));

    let repo = Arc::new(InMemoryGameRepository::new());
    let (service, backend) = service(&test_config(), repo.clone(), upstream);
    service.listings().top_games().await.unwrap();

    let err = service.pipeline().run_at(ts(50_000)).await.unwrap_err();
    assert!(matches!(err, SyncError::UpstreamFetch(_)));
    assert!(repo.is_empty());
    assert!(backend.get(TOP_GAMES_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn test_run_after_shutdown_is_cancelled_without_fetching() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream.expect_list_top().times(0);

    let repo = Arc::new(InMemoryGameRepository::new());
    let (service, _backend) = service(&test_config(), repo.clone(), upstream);
    service.shutdown();
    assert!(service.is_shut_down());

    let err = service.pipeline().run_at(ts(50_000)).await.unwrap_err();
    assert!(matches!(err, SyncError::Cancelled(_)));
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_all_failed_reconcile_skips_idle_reset() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_list_top()
        .returning(|_| Ok((page(&[("A", 1), ("B", 2)]), Pagination::default())));

    let repo = Arc::new(FailingRepository::new(&["A", "B"]));
    let (service, _) = service(&test_config(), repo, upstream);
    let report = service.pipeline().run_at(ts(50_000)).await.unwrap();

    assert_eq!(report.reconcile.pass.failed(), 2);
    assert!(report.reset.is_none());
    assert!(!report.stages.contains(&PipelineStage::ResetIdle));
    assert!(report.stages.contains(&PipelineStage::ServeFromCache));
}

#[tokio::test]
async fn test_partial_failure_keeps_pipeline_running() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream
        .expect_list_top()
        .returning(|_| Ok((page(&[("A", 1), ("B", 2), ("C", 3)]), Pagination::default())));

    let repo = Arc::new(FailingRepository::new(&["B"]));
    let (service, _) = service(&test_config(), repo, upstream);
    let report = service.pipeline().run_at(ts(50_000)).await.unwrap();

    assert_eq!(report.reconcile.persisted(), 2);
    assert_eq!(report.reconcile.pass.failures[0].key, "B");
    assert_eq!(names_in(report.listing.body().unwrap()), vec!["C", "A"]);
}

#[tokio::test]
async fn test_fetch_all_pages_follows_offsets_until_total() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream.expect_list_top().times(3).returning(|options| {
        let name = format!("game-{}", options.offset);
        let games = page(&[(name.as_str(), 10)]);
        Ok((
            games,
            Pagination {
                next_offset: Some(options.offset + 1),
                total: Some(3),
            },
        ))
    });

    let mut config = test_config();
    config.upstream.fetch_all_pages = true;
    let repo = Arc::new(InMemoryGameRepository::new());
    let (service, _) = service(&config, repo.clone(), upstream);

    let report = service.pipeline().run_at(ts(50_000)).await.unwrap();
    assert_eq!(report.reconcile.persisted(), 3);
    assert_eq!(repo.len(), 3);
}

#[tokio::test]
async fn test_streams_listing_is_cached_and_rejects_empty_game() {
    setup_logging();
    let mut upstream = MockUpstream::new();
    upstream.expect_list_streams().times(1).returning(|game| {
        Ok(vec![StreamSummary {
            id: 1,
            game: game.to_string(),
            channel: "caster".to_string(),
            viewers: 42,
            preview_template_url: None,
        }])
    });

    let repo = Arc::new(InMemoryGameRepository::new());
    let (service, backend) = service(&test_config(), repo, upstream);

    let err = service.listings().streams("").await.unwrap_err();
    assert!(err.is_client_error());

    let first = service.listings().streams("Tom & Jerry").await.unwrap();
    let second = service.listings().streams("Tom & Jerry").await.unwrap();
    assert_eq!(first.envelope, second.envelope);
    assert!(first.cache_control.is_none());
    assert!(first.body().unwrap().contains("\"channel\":\"caster\""));
    assert!(backend
        .get("streams_Tom &amp; Jerry")
        .await
        .unwrap()
        .is_some());
}
