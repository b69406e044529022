//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了把上游快照写入仓库的对账引擎。

use super::fanout::{FanOut, PassReport, PassStream};
use crate::error::Result;
use crate::model::{GameRecord, UpstreamGame};
use crate::repository::GameRepository;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const PASS_NAME: &str = "reconcile";

/// 一次对账的结果
#[derive(Debug, Clone)]
pub struct ReconcileReport {
    /// 本次同步时间戳
    pub synced_at: DateTime<Utc>,
    /// 快照中被丢弃的重名实体数量
    pub duplicates_skipped: usize,
    pub pass: PassReport<GameRecord>,
}

impl ReconcileReport {
    pub fn persisted(&self) -> usize {
        self.pass.succeeded()
    }
}

/// 对账引擎
///
/// 每个上游实体一个任务：按名称查找，存在则覆盖计数器后写回，不存在则新建。
/// 所有被写入的记录 `updated_at` 都等于同一个同步时间戳。
#[derive(Clone)]
pub struct ReconciliationEngine {
    repository: Arc<dyn GameRepository>,
    fanout: FanOut,
}

impl std::fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("fanout", &self.fanout)
            .finish()
    }
}

impl ReconciliationEngine {
    pub fn new(repository: Arc<dyn GameRepository>, fanout: FanOut) -> Self {
        Self { repository, fanout }
    }

    /// 按名称去重，保留首次出现的实体
    ///
    /// # 返回值
    ///
    /// 返回去重后的快照和被丢弃的数量
    pub fn dedupe(snapshot: Vec<UpstreamGame>) -> (Vec<UpstreamGame>, usize) {
        let mut seen = HashSet::with_capacity(snapshot.len());
        let before = snapshot.len();
        let unique: Vec<UpstreamGame> = snapshot
            .into_iter()
            .filter(|game| seen.insert(game.name.clone()))
            .collect();
        let skipped = before - unique.len();
        (unique, skipped)
    }

    /// 启动对账批次并返回结果流
    ///
    /// # 返回值
    ///
    /// 返回结果流和被去重丢弃的实体数量
    pub fn start(
        &self,
        snapshot: Vec<UpstreamGame>,
        synced_at: DateTime<Utc>,
    ) -> (PassStream<GameRecord>, usize) {
        let (unique, skipped) = Self::dedupe(snapshot);
        if skipped > 0 {
            warn!("Snapshot contained {} duplicate names, keeping first occurrence", skipped);
        }

        let repository = self.repository.clone();
        let stream = self.fanout.run(
            PASS_NAME,
            unique,
            |game| game.name.clone(),
            move |game| reconcile_one(repository.clone(), game, synced_at),
        );
        (stream, skipped)
    }

    /// 执行一次完整的对账并等待汇总结果
    #[instrument(skip(self, snapshot), level = "info", fields(snapshot_len = snapshot.len()))]
    pub async fn reconcile(
        &self,
        snapshot: Vec<UpstreamGame>,
        synced_at: DateTime<Utc>,
    ) -> Result<ReconcileReport> {
        let (stream, duplicates_skipped) = self.start(snapshot, synced_at);
        let pass = stream.report().await?;

        info!(
            "Reconciled snapshot: persisted={}, failed={}, duplicates={}",
            pass.succeeded(),
            pass.failed(),
            duplicates_skipped
        );

        Ok(ReconcileReport {
            synced_at,
            duplicates_skipped,
            pass,
        })
    }
}

async fn reconcile_one(
    repository: Arc<dyn GameRepository>,
    game: UpstreamGame,
    synced_at: DateTime<Utc>,
) -> Result<GameRecord> {
    let record = match repository.get_by_name(&game.name).await? {
        Some(mut existing) => {
            existing.apply_upstream(&game, synced_at);
            existing
        }
        None => GameRecord::from_upstream(&game, synced_at),
    };

    let stored = repository.upsert(record).await?;
    debug!(
        "Stored game: name={}, viewers={}, channels={}",
        stored.name, stored.viewers, stored.channels
    );
    Ok(stored)
}
