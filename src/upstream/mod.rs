//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了上游数据接口、分页拉取和限流。

pub mod rate_limit;
pub mod twitch;

use crate::error::{Result, SyncError};
use crate::model::{StreamSummary, UpstreamGame};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub use rate_limit::RateLimiter;
pub use twitch::TwitchClient;

/// 分页请求参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub limit: u32,
    pub offset: u32,
}

/// 上游返回的分页信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub next_offset: Option<u32>,
    pub total: Option<u32>,
}

impl Pagination {
    /// 是否还有下一页
    pub fn next_page(&self) -> Option<u32> {
        match (self.next_offset, self.total) {
            (Some(next), Some(total)) if next < total => Some(next),
            _ => None,
        }
    }
}

/// 上游数据接口
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// 拉取一页热门游戏
    async fn list_top(&self, options: ListOptions) -> Result<(Vec<UpstreamGame>, Pagination)>;

    /// 拉取某个游戏的直播流
    async fn list_streams(&self, game: &str) -> Result<Vec<StreamSummary>>;
}

/// 快照拉取器
///
/// 默认只拉取第一页；开启 `fetch_all_pages` 后沿 `next_offset` 翻页直到 `total`
pub struct SnapshotFetcher {
    client: Arc<dyn UpstreamClient>,
    limiter: Arc<RateLimiter>,
    page_limit: u32,
    fetch_all_pages: bool,
}

impl std::fmt::Debug for SnapshotFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotFetcher")
            .field("page_limit", &self.page_limit)
            .field("fetch_all_pages", &self.fetch_all_pages)
            .finish()
    }
}

impl SnapshotFetcher {
    pub fn new(
        client: Arc<dyn UpstreamClient>,
        limiter: Arc<RateLimiter>,
        page_limit: u32,
        fetch_all_pages: bool,
    ) -> Self {
        Self {
            client,
            limiter,
            page_limit,
            fetch_all_pages,
        }
    }

    /// 拉取上游快照
    ///
    /// 任一页失败都会让整次拉取失败
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self) -> Result<Vec<UpstreamGame>> {
        let mut snapshot = Vec::new();
        let mut options = ListOptions {
            limit: self.page_limit,
            offset: 0,
        };

        loop {
            self.limiter.acquire().await;
            let (page, pagination) = self.client.list_top(options).await.map_err(|e| match e {
                SyncError::UpstreamFetch(_) => e,
                other => SyncError::UpstreamFetch(other.to_string()),
            })?;
            snapshot.extend(page);

            if !self.fetch_all_pages {
                break;
            }

            match pagination.next_page() {
                Some(next) if next > options.offset => {
                    info!(
                        "Fetched games {} of {}",
                        next,
                        pagination.total.unwrap_or_default()
                    );
                    options.offset = next;
                }
                Some(next) => {
                    warn!(
                        "Upstream pagination did not advance (offset {} -> {}), stopping",
                        options.offset, next
                    );
                    break;
                }
                None => break,
            }
        }

        info!("Fetched upstream snapshot with {} games", snapshot.len());
        Ok(snapshot)
    }
}
