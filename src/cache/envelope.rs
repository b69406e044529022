//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存信封及其JSON编解码。

use crate::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// gzip数据的前两个字节
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 缓存信封
///
/// 缓存值与其过期时间一起存储，因为后端读取时不返回过期时间
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEnvelope {
    /// RFC 3339格式，保留纳秒
    pub expiration: DateTime<Utc>,
    pub payload: Vec<u8>,
}

impl CacheEnvelope {
    pub fn new(expiration: DateTime<Utc>, payload: Vec<u8>) -> Self {
        Self {
            expiration,
            payload,
        }
    }

    /// 负载按UTF-8解读
    pub fn payload_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.payload).map_err(|e| SyncError::Serialization(e.to_string()))
    }
}

/// 信封编解码器
///
/// 基于serde_json，可选gzip压缩
#[derive(Debug, Clone, Default)]
pub struct EnvelopeCodec {
    /// 是否启用压缩
    compress: bool,
}

impl EnvelopeCodec {
    /// 创建不压缩的编解码器
    pub fn new() -> Self {
        Self { compress: false }
    }

    /// 创建启用压缩的编解码器
    pub fn with_compression() -> Self {
        Self { compress: true }
    }

    /// 编码信封
    pub fn encode(&self, envelope: &CacheEnvelope) -> Result<Vec<u8>> {
        let json_bytes =
            serde_json::to_vec(envelope).map_err(|e| SyncError::Serialization(e.to_string()))?;

        if self.compress {
            compress(&json_bytes)
        } else {
            Ok(json_bytes)
        }
    }

    /// 解码信封
    ///
    /// 是否解压取决于数据本身，因此切换压缩配置后旧条目仍可读取
    pub fn decode(&self, data: &[u8]) -> Result<CacheEnvelope> {
        let json_bytes = if data.starts_with(&GZIP_MAGIC) {
            decompress(data)?
        } else {
            data.to_vec()
        };

        serde_json::from_slice(&json_bytes).map_err(|e| SyncError::Serialization(e.to_string()))
    }
}

#[cfg(feature = "compression")]
fn compress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder
        .write_all(data)
        .map_err(|e| SyncError::Serialization(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| SyncError::Serialization(e.to_string()))
}

#[cfg(not(feature = "compression"))]
fn compress(data: &[u8]) -> Result<Vec<u8>> {
    // 未启用压缩特性时原样写入
    Ok(data.to_vec())
}

#[cfg(feature = "compression")]
fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::GzDecoder;
    use std::io::Read;

    let mut decoder = GzDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| SyncError::Serialization(e.to_string()))?;
    Ok(decoded)
}

#[cfg(not(feature = "compression"))]
fn decompress(_data: &[u8]) -> Result<Vec<u8>> {
    Err(SyncError::Serialization(
        "compressed envelope found but the `compression` feature is disabled".to_string(),
    ))
}
