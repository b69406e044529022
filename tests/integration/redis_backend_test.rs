//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! Redis缓存后端集成测试，Redis不可用时跳过

#[path = "../common/mod.rs"]
mod common;

use common::{is_redis_available, setup_logging};
use gamesync::backend::{CacheBackend, RedisBackend};
use gamesync::config::CacheConfig;
use gamesync::CacheStore;
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

async fn backend() -> Option<RedisBackend> {
    let url = redis_url();
    if !is_redis_available(&url).await {
        println!("Skipping Redis test because Redis is not available at {}", url);
        return None;
    }
    let config = CacheConfig {
        connection_string: SecretString::new(url.into()),
        ..CacheConfig::default()
    };
    Some(RedisBackend::new(&config).await.unwrap())
}

fn unique_key(prefix: &str) -> String {
    format!("gamesync_test_{}_{}", prefix, uuid::Uuid::new_v4())
}

#[tokio::test]
async fn test_redis_get_set_delete() {
    setup_logging();
    let Some(backend) = backend().await else {
        return;
    };
    let key = unique_key("roundtrip");

    assert_eq!(backend.get(&key).await.unwrap(), None);
    backend
        .set(&key, b"payload".to_vec(), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(backend.get(&key).await.unwrap(), Some(b"payload".to_vec()));

    backend.delete(&key).await.unwrap();
    assert_eq!(backend.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_redis_entry_expires() {
    setup_logging();
    let Some(backend) = backend().await else {
        return;
    };
    let key = unique_key("ttl");

    backend
        .set(&key, b"short".to_vec(), Duration::from_secs(1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2_100)).await;
    assert_eq!(backend.get(&key).await.unwrap(), None);
}

#[tokio::test]
async fn test_cache_store_over_redis() {
    setup_logging();
    let Some(backend) = backend().await else {
        return;
    };
    let key = unique_key("store");
    let store = CacheStore::new(Arc::new(backend), Duration::from_secs(30));

    let first = store.fetch(&key, || async { Ok(b"one".to_vec()) }).await.unwrap();
    let second = store.fetch(&key, || async { Ok(b"two".to_vec()) }).await.unwrap();
    assert_eq!(first, second);

    store.invalidate(&key).await.unwrap();
}
