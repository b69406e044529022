//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存后端接口及其Redis、内存两种实现。

pub mod memory;
pub mod redis_backend;

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use self::memory::MemoryBackend;
pub use self::redis_backend::RedisBackend;

/// 缓存后端特征
///
/// 键为字符串，值为不透明字节，过期由后端自身负责。
/// 未命中是正常结果（`Ok(None)`），不是错误。
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// 读取键对应的字节
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// 写入字节并设置过期时间
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// 删除键，键不存在时不报错
    async fn delete(&self, key: &str) -> Result<()>;

    /// 后端名称，用于日志和指标
    fn name(&self) -> &'static str;
}
