//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块负责根据配置组装缓存、仓库、上游和同步引擎。

use crate::backend::{CacheBackend, MemoryBackend, RedisBackend};
use crate::cache::{CacheStore, EnvelopeCodec};
use crate::config::{CacheBackendType, CacheConfig, Config};
use crate::error::Result;
use crate::listing::ListingService;
use crate::pipeline::SyncPipeline;
use crate::repository::{GameRepository, SeaOrmGameRepository};
use crate::sync::{FanOut, IdleResetEngine, ReconciliationEngine};
use crate::upstream::{RateLimiter, SnapshotFetcher, TwitchClient, UpstreamClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// 同步服务
///
/// 所有协作者都通过构造函数显式注入
#[derive(Debug)]
pub struct GameSyncService {
    pipeline: SyncPipeline,
    cancel: CancellationToken,
}

impl GameSyncService {
    /// 按配置连接外部服务并组装
    #[instrument(skip(config), level = "info")]
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let backend = Self::build_backend(&config.cache).await?;
        let repository: Arc<dyn GameRepository> =
            Arc::new(SeaOrmGameRepository::connect(&config.database).await?);
        let upstream: Arc<dyn UpstreamClient> = Arc::new(TwitchClient::new(&config.upstream)?);

        Ok(Self::assemble(config, backend, repository, upstream))
    }

    /// 用给定的协作者组装服务，不做任何连接
    pub fn assemble(
        config: &Config,
        backend: Arc<dyn CacheBackend>,
        repository: Arc<dyn GameRepository>,
        upstream: Arc<dyn UpstreamClient>,
    ) -> Self {
        let codec = if config.cache.compress {
            EnvelopeCodec::with_compression()
        } else {
            EnvelopeCodec::new()
        };
        let cache = CacheStore::with_codec(backend, config.cache.ttl(), codec);

        let cancel = CancellationToken::new();
        let fanout = FanOut::new(config.sync.worker_pool_size, config.sync.pass_timeout())
            .with_cancellation(cancel.clone());

        let fetcher = SnapshotFetcher::new(
            upstream.clone(),
            Arc::new(RateLimiter::per_second(config.upstream.requests_per_second)),
            config.upstream.page_limit,
            config.upstream.fetch_all_pages,
        );
        let reconciler = ReconciliationEngine::new(repository.clone(), fanout.clone());
        let idle = IdleResetEngine::new(repository.clone(), fanout, config.sync.idle_window());
        let listings = ListingService::new(cache, repository, upstream, config.sync.top_limit);

        info!(
            "Assembled sync service: backend={}, pool={}, idle_window={}s",
            listings.cache().backend_name(),
            config.sync.worker_pool_size,
            config.sync.idle_window_secs
        );

        Self {
            pipeline: SyncPipeline::new(fetcher, reconciler, idle, listings)
                .with_cancellation(cancel.clone()),
            cancel,
        }
    }

    async fn build_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
        Ok(match config.backend {
            CacheBackendType::Redis => {
                let backend = RedisBackend::new(config).await?;
                backend.ping().await?;
                Arc::new(backend)
            }
            CacheBackendType::Memory => Arc::new(MemoryBackend::new(config.memory_capacity)),
        })
    }

    pub fn pipeline(&self) -> &SyncPipeline {
        &self.pipeline
    }

    pub fn listings(&self) -> &ListingService {
        self.pipeline.listings()
    }

    /// 取消所有进行中的批次
    ///
    /// 关闭不可撤销：之后的 `run`/`run_at` 都返回 `Cancelled`，需要重新构建服务
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
