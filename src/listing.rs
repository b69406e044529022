//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了经过读穿透缓存的列表读取。

use crate::cache::{CacheControl, CacheEnvelope, CacheStore};
use crate::error::{Result, SyncError};
use crate::model::GameRecord;
use crate::repository::{GameField, GameRepository};
use crate::upstream::UpstreamClient;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// 热门游戏列表的缓存键
pub const TOP_GAMES_KEY: &str = "top_games";

/// 一次列表读取的结果
#[derive(Debug, Clone)]
pub struct Listing {
    pub envelope: CacheEnvelope,
    /// 只有热门游戏列表携带缓存头
    pub cache_control: Option<CacheControl>,
}

impl Listing {
    pub fn body(&self) -> Result<&str> {
        self.envelope.payload_str()
    }
}

#[derive(Serialize)]
struct TopGameEntry<'a> {
    name: &'a str,
    #[serde(rename = "boxTemplateURL")]
    box_template_url: &'a str,
}

/// 列表服务
#[derive(Clone)]
pub struct ListingService {
    cache: CacheStore,
    repository: Arc<dyn GameRepository>,
    upstream: Arc<dyn UpstreamClient>,
    top_limit: u64,
}

impl std::fmt::Debug for ListingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingService")
            .field("cache", &self.cache)
            .field("top_limit", &self.top_limit)
            .finish()
    }
}

impl ListingService {
    pub fn new(
        cache: CacheStore,
        repository: Arc<dyn GameRepository>,
        upstream: Arc<dyn UpstreamClient>,
        top_limit: u64,
    ) -> Self {
        Self {
            cache,
            repository,
            upstream,
            top_limit,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// 按观众数降序的热门游戏
    #[instrument(skip(self), level = "debug")]
    pub async fn top_games(&self) -> Result<Listing> {
        let repository = self.repository.clone();
        let limit = self.top_limit;

        let envelope = self
            .cache
            .fetch(TOP_GAMES_KEY, || async move {
                let games = repository.query_top(GameField::Viewers, limit).await?;
                encode_top_games(&games)
            })
            .await?;

        let cache_control = Some(CacheControl::from_envelope(&envelope, Utc::now()));
        Ok(Listing {
            envelope,
            cache_control,
        })
    }

    /// 某个游戏的直播流
    ///
    /// `game` 为空时直接拒绝，不访问缓存
    #[instrument(skip(self), level = "debug")]
    pub async fn streams(&self, game: &str) -> Result<Listing> {
        if game.is_empty() {
            return Err(SyncError::MalformedInput("No game specified".to_string()));
        }

        let upstream = self.upstream.clone();
        let name = game.to_string();
        let envelope = self
            .cache
            .fetch(&streams_key(game), || async move {
                let streams = upstream.list_streams(&name).await?;
                serde_json::to_vec(&streams).map_err(|e| SyncError::Serialization(e.to_string()))
            })
            .await?;

        Ok(Listing {
            envelope,
            cache_control: None,
        })
    }

    /// 让热门游戏列表在下次读取时重新计算
    pub async fn invalidate_top_games(&self) -> Result<()> {
        self.cache.invalidate(TOP_GAMES_KEY).await
    }
}

/// 直播流列表的缓存键，游戏名做HTML转义
pub fn streams_key(game: &str) -> String {
    format!("streams_{}", escape_html(game))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}

fn encode_top_games(games: &[GameRecord]) -> Result<Vec<u8>> {
    let entries: Vec<TopGameEntry<'_>> = games
        .iter()
        .map(|g| TopGameEntry {
            name: &g.name,
            box_template_url: &g.box_template_url,
        })
        .collect();
    serde_json::to_vec(&entries).map_err(|e| SyncError::Serialization(e.to_string()))
}
