//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步流水线：拉取、对账、空闲重置、缓存失效、读取。

use crate::error::{Result, SyncError};
use crate::listing::{Listing, ListingService};
use crate::model::GameRecord;
use crate::sync::{IdleResetEngine, PassReport, ReconcileReport, ReconciliationEngine};
use crate::upstream::SnapshotFetcher;
use chrono::{DateTime, SubsecRound, Utc};
use tokio_util::sync::CancellationToken;
use std::fmt;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FetchUpstream,
    Reconcile,
    ResetIdle,
    InvalidateCache,
    ServeFromCache,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::FetchUpstream => "fetch_upstream",
            PipelineStage::Reconcile => "reconcile",
            PipelineStage::ResetIdle => "reset_idle",
            PipelineStage::InvalidateCache => "invalidate_cache",
            PipelineStage::ServeFromCache => "serve_from_cache",
        };
        f.write_str(name)
    }
}

/// 一次流水线运行的结果
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// 本次运行的标识，同时写入日志span
    pub run_id: Uuid,
    pub synced_at: DateTime<Utc>,
    /// 已完成的阶段，按执行顺序
    pub stages: Vec<PipelineStage>,
    pub reconcile: ReconcileReport,
    /// 对账没有写入任何记录时为None
    pub reset: Option<PassReport<GameRecord>>,
    pub listing: Listing,
}

/// 同步流水线
///
/// 阶段之间不持久化中间状态；中途失败时仓库可能部分更新，
/// 下次运行会收敛。
#[derive(Debug)]
pub struct SyncPipeline {
    fetcher: SnapshotFetcher,
    reconciler: ReconciliationEngine,
    idle: IdleResetEngine,
    listings: ListingService,
    cancel: CancellationToken,
}

impl SyncPipeline {
    pub fn new(
        fetcher: SnapshotFetcher,
        reconciler: ReconciliationEngine,
        idle: IdleResetEngine,
        listings: ListingService,
    ) -> Self {
        Self {
            fetcher,
            reconciler,
            idle,
            listings,
            cancel: CancellationToken::new(),
        }
    }

    /// 共享关闭令牌；令牌取消后 `run_at` 不再启动新的运行
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn listings(&self) -> &ListingService {
        &self.listings
    }

    /// 以当前时间（微秒精度）作为同步时间戳运行
    pub async fn run(&self) -> Result<PipelineReport> {
        self.run_at(Utc::now().trunc_subsecs(6)).await
    }

    /// 以指定同步时间戳运行
    ///
    /// 上游拉取失败会在对账前终止；单个实体失败只记录在报告中。
    /// 关闭后调用直接返回 `Cancelled`，不访问上游
    #[instrument(skip(self), level = "info", fields(run_id = tracing::field::Empty))]
    pub async fn run_at(&self, synced_at: DateTime<Utc>) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        if self.cancel.is_cancelled() {
            warn!("Pipeline refused, service has been shut down");
            return Err(SyncError::Cancelled(
                "sync service has been shut down".to_string(),
            ));
        }
        let mut stages = Vec::with_capacity(5);

        info!("Pipeline stage: {}", PipelineStage::FetchUpstream);
        let snapshot = self.fetcher.fetch().await.map_err(|e| {
            error!("Pipeline aborted, upstream fetch failed: {}", e);
            e
        })?;
        stages.push(PipelineStage::FetchUpstream);

        info!("Pipeline stage: {}", PipelineStage::Reconcile);
        let reconcile = self.reconciler.reconcile(snapshot, synced_at).await?;
        if !reconcile.pass.is_complete() {
            warn!(
                "Reconcile finished with {} failures, continuing",
                reconcile.pass.failed()
            );
        }
        stages.push(PipelineStage::Reconcile);

        let reset = if reconcile.persisted() == 0 {
            warn!("No games persisted, skipping idle reset");
            None
        } else {
            info!("Pipeline stage: {}", PipelineStage::ResetIdle);
            let report = self.idle.reset_idle(synced_at).await?;
            stages.push(PipelineStage::ResetIdle);
            Some(report)
        };

        info!("Pipeline stage: {}", PipelineStage::InvalidateCache);
        self.listings.invalidate_top_games().await?;
        stages.push(PipelineStage::InvalidateCache);

        info!("Pipeline stage: {}", PipelineStage::ServeFromCache);
        let listing = self.listings.top_games().await?;
        stages.push(PipelineStage::ServeFromCache);

        Ok(PipelineReport {
            run_id,
            synced_at,
            stages,
            reconcile,
            reset,
            listing,
        })
    }
}
