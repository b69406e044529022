//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于reqwest的Twitch上游客户端。

use super::{ListOptions, Pagination, UpstreamClient};
use crate::config::UpstreamConfig;
use crate::error::{Result, SyncError};
use crate::model::{StreamSummary, UpstreamGame};
use crate::utils::redaction::redact_value;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const ACCEPT_V5: &str = "application/vnd.twitchtv.v5+json";

/// Twitch Kraken客户端
pub struct TwitchClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl std::fmt::Debug for TwitchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitchClient")
            .field("base_url", &self.base_url)
            .field("api_key", &redact_value(self.api_key.expose_secret(), 4))
            .finish()
    }
}

impl TwitchClient {
    /// 根据上游配置创建客户端
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("Client-ID", self.api_key.expose_secret())
            .header("Accept", ACCEPT_V5)
            .query(query)
            .send()
            .await
            .map_err(|e| SyncError::UpstreamFetch(format!("GET {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => {
                    SyncError::UpstreamFetch(format!("GET {} rate limited", path))
                }
                _ => SyncError::UpstreamFetch(format!(
                    "GET {} returned {}: {}",
                    path,
                    status.as_u16(),
                    body
                )),
            });
        }

        response
            .json()
            .await
            .map_err(|e| SyncError::UpstreamFetch(format!("Failed to parse {} response: {}", path, e)))
    }
}

#[async_trait]
impl UpstreamClient for TwitchClient {
    #[instrument(skip(self), level = "debug")]
    async fn list_top(&self, options: ListOptions) -> Result<(Vec<UpstreamGame>, Pagination)> {
        let query = [
            ("limit", options.limit.to_string()),
            ("offset", options.offset.to_string()),
        ];
        let page: TopGamesPage = self.get("games/top", &query).await?;
        let (games, pagination) = page.into_snapshot(options.offset);
        debug!(
            "Twitch list_top: offset={}, returned={}, total={:?}",
            options.offset,
            games.len(),
            pagination.total
        );
        Ok((games, pagination))
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_streams(&self, game: &str) -> Result<Vec<StreamSummary>> {
        let page: StreamsPage = self.get("streams", &[("game", game.to_string())]).await?;
        debug!("Twitch list_streams: game={}, returned={}", game, page.streams.len());
        Ok(page.streams.into_iter().map(StreamSummary::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct TopGamesPage {
    #[serde(rename = "_total")]
    total: Option<u32>,
    #[serde(default)]
    top: Vec<TopEntry>,
}

impl TopGamesPage {
    fn into_snapshot(self, offset: u32) -> (Vec<UpstreamGame>, Pagination) {
        let returned = self.top.len() as u32;
        let games = self.top.into_iter().map(UpstreamGame::from).collect();
        let pagination = Pagination {
            next_offset: Some(offset.saturating_add(returned)),
            total: self.total,
        };
        (games, pagination)
    }
}

#[derive(Debug, Deserialize)]
struct TopEntry {
    #[serde(default)]
    viewers: i64,
    #[serde(default)]
    channels: i64,
    game: GamePayload,
}

#[derive(Debug, Deserialize)]
struct GamePayload {
    /// 游戏的外部标识取自GiantBomb
    #[serde(default)]
    giantbomb_id: i64,
    name: String,
    popularity: Option<i64>,
    #[serde(rename = "box")]
    box_art: Option<ImageTemplate>,
    logo: Option<ImageTemplate>,
}

#[derive(Debug, Deserialize)]
struct ImageTemplate {
    template: Option<String>,
}

impl From<TopEntry> for UpstreamGame {
    fn from(entry: TopEntry) -> Self {
        Self {
            name: entry.game.name,
            external_id: entry.game.giantbomb_id,
            popularity: entry.game.popularity,
            viewers: entry.viewers,
            channels: entry.channels,
            box_template_url: entry.game.box_art.and_then(|b| b.template),
            logo_template_url: entry.game.logo.and_then(|l| l.template),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamsPage {
    #[serde(default)]
    streams: Vec<StreamPayload>,
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(rename = "_id")]
    id: i64,
    #[serde(default)]
    game: String,
    #[serde(default)]
    viewers: i64,
    preview: Option<ImageTemplate>,
    channel: ChannelPayload,
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    name: String,
}

impl From<StreamPayload> for StreamSummary {
    fn from(stream: StreamPayload) -> Self {
        Self {
            id: stream.id,
            game: stream.game,
            channel: stream.channel.name,
            viewers: stream.viewers,
            preview_template_url: stream.preview.and_then(|p| p.template),
        }
    }
}
