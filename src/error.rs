//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步系统的错误类型和处理机制。

use thiserror::Error;

/// 同步系统错误类型枚举
///
/// 缓存后端、持久化存储、上游接口以及调用方输入可能产生的错误
#[derive(Error, Debug)]
pub enum SyncError {
    /// 缓存或存储后端不可用（非"未找到"类失败）
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// 上游接口拉取失败
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// 调用方输入不合法
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 违反唯一性约束
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 任务被取消
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Sea-ORM数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Redis错误
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// HTTP错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// 是否应当以"服务不可用"的形式暴露给调用方
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            SyncError::BackendUnavailable(_)
                | SyncError::Database(_)
                | SyncError::Redis(_)
                | SyncError::Timeout(_)
                | SyncError::UpstreamFetch(_)
                | SyncError::Http(_)
        )
    }

    /// 是否为调用方输入错误
    pub fn is_client_error(&self) -> bool {
        matches!(self, SyncError::MalformedInput(_))
    }
}

/// 同步操作结果类型别名
pub type Result<T> = std::result::Result<T, SyncError>;
