//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 根据缓存信封推导HTTP缓存控制元数据。

use super::envelope::CacheEnvelope;
use chrono::{DateTime, Utc};

/// HTTP缓存控制元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheControl {
    /// 剩余有效秒数，已过期时为0
    pub max_age: i64,
    /// RFC 1123 格式的过期时间
    pub expires: String,
}

impl CacheControl {
    /// 根据信封的过期时间推导，不需要重新计算负载
    pub fn from_envelope(envelope: &CacheEnvelope, now: DateTime<Utc>) -> Self {
        let max_age = (envelope.expiration - now).num_seconds().max(0);
        Self {
            max_age,
            expires: envelope
                .expiration
                .format("%a, %d %b %Y %H:%M:%S GMT")
                .to_string(),
        }
    }

    /// `Cache-Control` 头的值
    pub fn header_value(&self) -> String {
        format!("public, max-age={}", self.max_age)
    }
}
