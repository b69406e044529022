//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和故障注入封装。

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use gamesync::backend::CacheBackend;
use gamesync::config::DatabaseConfig;
use gamesync::error::{Result, SyncError};
use gamesync::repository::{
    GameQuery, GameRepository, InMemoryGameRepository, SeaOrmGameRepository,
};
use gamesync::GameRecord;
use secrecy::SecretString;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

/// 秒级时间戳
#[allow(dead_code)]
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

/// 内存中的SQLite仓库，每次调用都是一个新库
#[allow(dead_code)]
pub async fn sqlite_repository() -> Arc<dyn GameRepository> {
    let config = DatabaseConfig {
        connection_string: SecretString::new("sqlite::memory:".to_string().into()),
        max_connections: 1,
        connect_timeout_secs: 10,
    };
    Arc::new(SeaOrmGameRepository::connect(&config).await.unwrap())
}

/// 需要在两种实现上都成立的测试使用
#[allow(dead_code)]
pub async fn repositories() -> Vec<(&'static str, Arc<dyn GameRepository>)> {
    let memory: Arc<dyn GameRepository> = Arc::new(InMemoryGameRepository::new());
    vec![("memory", memory), ("sqlite", sqlite_repository().await)]
}

/// 对指定名称的写入返回错误的仓库
#[allow(dead_code)]
pub struct FailingRepository {
    pub inner: InMemoryGameRepository,
    fail_names: HashSet<String>,
    /// 在写入前等待的时间，用于制造并发交错
    delay: Duration,
}

#[allow(dead_code)]
impl FailingRepository {
    pub fn new(fail_names: &[&str]) -> Self {
        Self {
            inner: InMemoryGameRepository::new(),
            fail_names: fail_names.iter().map(|s| s.to_string()).collect(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl GameRepository for FailingRepository {
    async fn query(&self, query: &GameQuery) -> Result<Vec<GameRecord>> {
        self.inner.query(query).await
    }

    async fn upsert(&self, record: GameRecord) -> Result<GameRecord> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail_names.contains(&record.name) {
            return Err(SyncError::BackendUnavailable(format!(
                "injected failure for {}",
                record.name
            )));
        }
        self.inner.upsert(record).await
    }
}

/// 所有查询都失败的仓库
#[allow(dead_code)]
pub struct UnreachableRepository;

#[async_trait]
impl GameRepository for UnreachableRepository {
    async fn query(&self, _query: &GameQuery) -> Result<Vec<GameRecord>> {
        Err(SyncError::BackendUnavailable("store unreachable".to_string()))
    }

    async fn upsert(&self, _record: GameRecord) -> Result<GameRecord> {
        Err(SyncError::BackendUnavailable("store unreachable".to_string()))
    }
}

/// 读取总是失败、记录写入次数的缓存后端
#[allow(dead_code)]
#[derive(Default)]
pub struct UnreachableBackend {
    pub writes: AtomicUsize,
}

#[async_trait]
impl CacheBackend for UnreachableBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        Err(SyncError::BackendUnavailable("cache unreachable".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "unreachable"
    }
}

/// 计数的计算函数工厂
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct ComputeCounter {
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl ComputeCounter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bump(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// 检查Redis是否可用
#[allow(dead_code)]
pub async fn is_redis_available(url: &str) -> bool {
    let client = match redis::Client::open(url) {
        Ok(client) => client,
        Err(_) => return false,
    };
    matches!(
        tokio::time::timeout(
            Duration::from_secs(2),
            client.get_multiplexed_async_connection()
        )
        .await,
        Ok(Ok(_))
    )
}
