//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了空闲记录的计数器重置。

use super::fanout::{FanOut, PassReport, PassStream};
use crate::error::{Result, SyncError};
use crate::model::GameRecord;
use crate::repository::GameRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

const PASS_NAME: &str = "reset_idle";

/// 空闲重置引擎
///
/// `updated_at <= T - W` 的记录被视为空闲，计数器清零并标记为 T
#[derive(Clone)]
pub struct IdleResetEngine {
    repository: Arc<dyn GameRepository>,
    fanout: FanOut,
    idle_window: Duration,
}

impl std::fmt::Debug for IdleResetEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdleResetEngine")
            .field("fanout", &self.fanout)
            .field("idle_window", &self.idle_window)
            .finish()
    }
}

impl IdleResetEngine {
    pub fn new(repository: Arc<dyn GameRepository>, fanout: FanOut, idle_window: Duration) -> Self {
        Self {
            repository,
            fanout,
            idle_window,
        }
    }

    pub fn idle_window(&self) -> Duration {
        self.idle_window
    }

    /// 计算空闲截止时间 `T - W`
    pub fn cutoff(&self, synced_at: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let window = chrono::Duration::from_std(self.idle_window)
            .map_err(|e| SyncError::Config(format!("idle window out of range: {}", e)))?;
        synced_at
            .checked_sub_signed(window)
            .ok_or_else(|| SyncError::Config("idle window exceeds timestamp range".to_string()))
    }

    /// 查询空闲记录并启动重置批次
    ///
    /// 查询失败时直接返回错误，不会启动任何任务
    pub async fn start(&self, synced_at: DateTime<Utc>) -> Result<PassStream<GameRecord>> {
        let cutoff = self.cutoff(synced_at)?;
        let idle = self.repository.updated_at_or_before(cutoff).await?;
        debug!("Found {} idle games at or before {}", idle.len(), cutoff);

        let repository = self.repository.clone();
        Ok(self.fanout.run(
            PASS_NAME,
            idle,
            |record| record.name.clone(),
            move |record| reset_one(repository.clone(), record, synced_at),
        ))
    }

    /// 执行一次完整的空闲重置并等待汇总结果
    #[instrument(skip(self), level = "info")]
    pub async fn reset_idle(&self, synced_at: DateTime<Utc>) -> Result<PassReport<GameRecord>> {
        let report = self.start(synced_at).await?.report().await?;
        info!(
            "Reset idle games: reset={}, failed={}",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }
}

async fn reset_one(
    repository: Arc<dyn GameRepository>,
    mut record: GameRecord,
    synced_at: DateTime<Utc>,
) -> Result<GameRecord> {
    record.reset_activity(synced_at);
    let stored = repository.upsert(record).await?;
    debug!("Reset idle game: name={}", stored.name);
    Ok(stored)
}
