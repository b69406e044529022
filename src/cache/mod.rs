//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了读穿透缓存 `CacheStore`。

pub mod control;
pub mod envelope;

use crate::backend::CacheBackend;
use crate::error::{Result, SyncError};
use crate::metrics::GLOBAL_METRICS;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub use control::CacheControl;
pub use envelope::{CacheEnvelope, EnvelopeCodec};

/// 读穿透缓存
///
/// 命中时原样返回已存储的信封；未命中时调用计算函数，成功后写入并返回。
/// 计算失败不会写入缓存。
///
/// 同一冷键上的并发调用各自计算并写入，不做单飞去重。
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    codec: EnvelopeCodec,
    ttl: Duration,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend.name())
            .field("codec", &self.codec)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl CacheStore {
    /// 创建新的读穿透缓存
    ///
    /// # 参数
    ///
    /// * `backend` - 缓存后端
    /// * `ttl` - 所有键共用的过期时间
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self::with_codec(backend, ttl, EnvelopeCodec::new())
    }

    pub fn with_codec(backend: Arc<dyn CacheBackend>, ttl: Duration, codec: EnvelopeCodec) -> Self {
        Self {
            backend,
            codec,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// 读取缓存，未命中时计算并回填
    ///
    /// # 参数
    ///
    /// * `key` - 缓存键
    /// * `compute` - 未命中时调用的计算函数
    ///
    /// # 返回值
    ///
    /// 返回命中或新写入的信封。后端读取失败（非未命中）或命中条目无法解码时直接返回错误，不会退化为未命中。
    #[instrument(skip(self, compute), level = "debug", fields(backend = self.backend.name()))]
    pub async fn fetch<F, Fut>(&self, key: &str, compute: F) -> Result<CacheEnvelope>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>>>,
    {
        let backend = self.backend.name();

        if let Some(bytes) = self.backend.get(key).await? {
            // 命中但无法解码时返回错误，不重新计算也不覆盖
            let envelope = self.codec.decode(&bytes).map_err(|e| {
                warn!("Cache entry undecodable: key={}, error={}", key, e);
                GLOBAL_METRICS.record_cache(backend, "corrupt");
                e
            })?;
            debug!("Cache hit: key={}", key);
            GLOBAL_METRICS.record_cache(backend, "hit");
            return Ok(envelope);
        }

        info!("Cache miss: key={}", key);
        GLOBAL_METRICS.record_cache(backend, "miss");

        let payload = compute().await?;
        GLOBAL_METRICS.record_cache(backend, "compute");

        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| SyncError::Config(format!("cache ttl out of range: {}", e)))?;
        let envelope = CacheEnvelope::new(Utc::now() + ttl, payload);
        let encoded = self.codec.encode(&envelope)?;

        self.backend.set(key, encoded, self.ttl).await?;
        GLOBAL_METRICS.record_cache(backend, "write");
        debug!("Cache filled: key={}, expiration={}", key, envelope.expiration);

        Ok(envelope)
    }

    /// 删除缓存键，键不存在时不报错
    #[instrument(skip(self), level = "debug")]
    pub async fn invalidate(&self, key: &str) -> Result<()> {
        self.backend.delete(key).await?;
        GLOBAL_METRICS.record_cache(self.backend.name(), "invalidate");
        info!("Cache invalidated: key={}", key);
        Ok(())
    }
}
