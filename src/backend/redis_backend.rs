//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Redis的缓存后端实现。

use super::CacheBackend;
use crate::config::CacheConfig;
use crate::error::{Result, SyncError};
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use secrecy::ExposeSecret;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Redis缓存后端
///
/// 通过 `ConnectionManager` 自动重连，每条命令都受命令超时约束
#[derive(Clone)]
pub struct RedisBackend {
    manager: ConnectionManager,
    command_timeout: Duration,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

impl RedisBackend {
    /// 创建新的Redis缓存后端实例
    ///
    /// # 参数
    ///
    /// * `config` - 缓存配置
    ///
    /// # 返回值
    ///
    /// 返回新的RedisBackend实例或错误
    #[instrument(skip(config), level = "info", name = "init_redis_backend")]
    pub async fn new(config: &CacheConfig) -> Result<Self> {
        let connection_string = config.connection_string.expose_secret();
        debug!(
            "Connecting to Redis: {}",
            redact_connection_string(connection_string)
        );

        let client = Client::open(connection_string)
            .map_err(|e| SyncError::Config(format!("Invalid Redis connection string: {}", e)))?;

        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => res.map_err(|e| SyncError::BackendUnavailable(e.to_string()))?,
            Err(_) => {
                return Err(SyncError::BackendUnavailable(format!(
                    "Redis connection timed out after {}ms. Target: {}",
                    config.connection_timeout_ms,
                    redact_connection_string(connection_string)
                )));
            }
        };

        Ok(Self {
            manager,
            command_timeout: Duration::from_millis(config.command_timeout_ms),
        })
    }

    /// 在命令超时内执行Redis操作，非超时的失败统一视为后端不可用
    async fn run<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.command_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(SyncError::BackendUnavailable(format!(
                "Redis {} failed: {}",
                op, e
            ))),
            Err(_) => Err(SyncError::Timeout(format!(
                "Redis {} timed out after {}ms",
                op,
                self.command_timeout.as_millis()
            ))),
        }
    }

    /// 检查连接是否正常
    #[instrument(skip(self), level = "debug")]
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let response: String = self
            .run("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        debug!("Redis ping response: {}", response);
        Ok(())
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.manager.clone();
        let value: Option<Vec<u8>> = self.run("GET", conn.get(key)).await?;
        debug!("Redis get: key={}, found={}", key, value.is_some());
        Ok(value)
    }

    #[instrument(skip(self, value), level = "debug", fields(value_len = value.len()))]
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        // Redis的EX最小粒度为秒
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.manager.clone();
        self.run::<(), _>("SET", conn.set_ex(key, value, ttl_secs))
            .await?;
        debug!("Redis set: key={}, ttl={}s", key, ttl_secs);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        let removed: i64 = self.run("DEL", conn.del(key)).await?;
        debug!("Redis delete: key={}, removed={}", key, removed);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
