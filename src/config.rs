//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步服务的配置结构和解析逻辑。

use crate::error::{Result, SyncError};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 上游API密钥的环境变量名
pub const API_KEY_ENV: &str = "TWITCH_API_KEY";

/// 单个键允许的最大TTL（秒）
const MAX_TTL_SECS: u64 = 86400 * 30;

/// 顶层配置
///
/// 启动时读取一次，之后以显式参数的方式传递给各组件
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// 上游接口配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct UpstreamConfig {
    /// 上游API密钥
    pub api_key: SecretString,
    /// 接口基础地址
    pub base_url: String,
    /// 每页请求数量
    pub page_limit: u32,
    /// 是否跟随分页拉取全部数据，默认只拉取第一页以减少写入量
    pub fetch_all_pages: bool,
    /// 每秒允许的请求数
    pub requests_per_second: u64,
    /// 单次请求超时时间（毫秒）
    pub request_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::new(String::new().into()),
            base_url: "https://api.twitch.tv/kraken".to_string(),
            page_limit: 100,
            fetch_all_pages: false,
            requests_per_second: 1,
            request_timeout_ms: 10_000,
        }
    }
}

/// 缓存后端类型
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendType {
    /// Redis分布式缓存
    #[default]
    Redis,
    /// 进程内缓存
    Memory,
}

/// 缓存配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheConfig {
    /// 后端类型
    pub backend: CacheBackendType,
    /// 所有键共用的过期时间（秒）
    pub ttl_secs: u64,
    /// Redis连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// 是否压缩缓存信封
    pub compress: bool,
    /// 进程内缓存的最大条目数
    pub memory_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendType::Redis,
            ttl_secs: 15 * 60,
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            compress: false,
            memory_capacity: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// 持久化存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 数据库连接字符串（postgres / mysql / sqlite）
    pub connection_string: SecretString,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: SecretString::new("sqlite://gamesync.db?mode=rwc".to_string().into()),
            max_connections: 10,
            connect_timeout_secs: 30,
        }
    }
}

/// 对账与空闲重置配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SyncConfig {
    /// 空闲窗口（秒），超过该时长未更新的记录会被清零
    pub idle_window_secs: u64,
    /// 并发工作池大小
    pub worker_pool_size: usize,
    /// 单次对账/重置的整体超时时间（秒）
    pub pass_timeout_secs: u64,
    /// 热门列表条目数
    pub top_limit: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            idle_window_secs: 60,
            worker_pool_size: 16,
            pass_timeout_secs: 120,
            top_limit: 50,
        }
    }
}

impl SyncConfig {
    pub fn idle_window(&self) -> Duration {
        Duration::from_secs(self.idle_window_secs)
    }

    pub fn pass_timeout(&self) -> Duration {
        Duration::from_secs(self.pass_timeout_secs)
    }
}

impl Config {
    /// 从TOML文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// 从文件加载配置，并应用环境变量覆盖
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// 应用环境变量覆盖
    ///
    /// 只在启动时调用一次
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() {
                self.upstream.api_key = SecretString::new(key.into());
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            return Err(SyncError::Config("cache ttl_secs cannot be zero".to_string()));
        }

        if self.cache.ttl_secs > MAX_TTL_SECS {
            return Err(SyncError::Config(
                "cache ttl_secs cannot exceed 30 days (2592000 seconds)".to_string(),
            ));
        }

        if self.cache.backend == CacheBackendType::Memory && self.cache.memory_capacity == 0 {
            return Err(SyncError::Config(
                "cache memory_capacity cannot be zero".to_string(),
            ));
        }

        if !(100..=60000).contains(&self.cache.command_timeout_ms) {
            return Err(SyncError::Config(
                "cache command_timeout_ms must be between 100 and 60000 ms".to_string(),
            ));
        }

        if self.upstream.page_limit == 0 || self.upstream.page_limit > 100 {
            return Err(SyncError::Config(
                "upstream page_limit must be between 1 and 100".to_string(),
            ));
        }

        if self.upstream.requests_per_second == 0 {
            return Err(SyncError::Config(
                "upstream requests_per_second cannot be zero".to_string(),
            ));
        }

        if self.database.connection_string.expose_secret().is_empty() {
            return Err(SyncError::Config(
                "database connection_string cannot be empty".to_string(),
            ));
        }

        if self.sync.worker_pool_size == 0 || self.sync.worker_pool_size > 1024 {
            return Err(SyncError::Config(
                "sync worker_pool_size must be between 1 and 1024".to_string(),
            ));
        }

        if self.sync.idle_window_secs == 0 {
            return Err(SyncError::Config(
                "sync idle_window_secs cannot be zero".to_string(),
            ));
        }

        if self.sync.pass_timeout_secs == 0 {
            return Err(SyncError::Config(
                "sync pass_timeout_secs cannot be zero".to_string(),
            ));
        }

        if self.sync.top_limit == 0 {
            return Err(SyncError::Config("sync top_limit cannot be zero".to_string()));
        }

        Ok(())
    }
}
