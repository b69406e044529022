//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于内存的缓存后端实现。

use super::CacheBackend;
use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 内存缓存后端
///
/// 使用Moka作为底层缓存库，适用于单进程部署和测试
#[derive(Clone)]
pub struct MemoryBackend {
    // 值: (数据, 过期时间)
    cache: Cache<String, (Vec<u8>, Instant)>,
}

impl MemoryBackend {
    /// 创建新的内存缓存后端实例
    ///
    /// # 参数
    ///
    /// * `capacity` - 最大条目数
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// 当前条目数（包含尚未清理的过期条目）
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.cache.get(key).await {
            Some((bytes, expire_at)) => {
                if Instant::now() >= expire_at {
                    self.cache.remove(key).await;
                    debug!("Memory get: key={}, expired=true, removed", key);
                    return Ok(None);
                }
                debug!("Memory get: key={}, found=true", key);
                Ok(Some(bytes))
            }
            None => {
                debug!("Memory get: key={}, found=false", key);
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let expire_at = Instant::now() + ttl;
        self.cache.insert(key.to_string(), (value, expire_at)).await;
        debug!("Memory set: key={}, ttl={:?}", key, ttl);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        self.cache.remove(key).await;
        debug!("Memory delete: key={}", key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
