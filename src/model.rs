//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了持久化记录与上游实体的数据模型。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 持久化的游戏记录
///
/// `name` 是自然键，`id` 由存储分配
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// 存储分配的标识，未持久化时为None
    pub id: Option<i64>,
    pub name: String,
    pub external_id: i64,
    pub popularity: i64,
    pub viewers: i64,
    pub channels: i64,
    pub box_template_url: String,
    pub logo_template_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GameRecord {
    /// 根据上游实体构建尚未持久化的记录
    ///
    /// `created_at` 和 `updated_at` 都取同步时间戳
    pub fn from_upstream(game: &UpstreamGame, synced_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            name: game.name.clone(),
            external_id: game.external_id,
            popularity: game.popularity.unwrap_or_default(),
            viewers: game.viewers,
            channels: game.channels,
            box_template_url: game.box_template_url.clone().unwrap_or_default(),
            logo_template_url: game.logo_template_url.clone().unwrap_or_default(),
            created_at: synced_at,
            updated_at: synced_at,
        }
    }

    /// 用上游实体覆盖计数器、图片模板和热度
    ///
    /// 可选字段只有在上游提供时才覆盖，`created_at` 保持不变
    pub fn apply_upstream(&mut self, game: &UpstreamGame, synced_at: DateTime<Utc>) {
        self.viewers = game.viewers;
        self.channels = game.channels;

        if let Some(url) = &game.box_template_url {
            self.box_template_url = url.clone();
        }

        if let Some(url) = &game.logo_template_url {
            self.logo_template_url = url.clone();
        }

        if let Some(popularity) = game.popularity {
            self.popularity = popularity;
        }

        self.updated_at = synced_at;
    }

    /// 清零活跃计数器
    pub fn reset_activity(&mut self, synced_at: DateTime<Utc>) {
        self.viewers = 0;
        self.channels = 0;
        self.updated_at = synced_at;
    }
}

/// 上游快照中的单个游戏
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamGame {
    pub name: String,
    pub external_id: i64,
    pub popularity: Option<i64>,
    pub viewers: i64,
    pub channels: i64,
    pub box_template_url: Option<String>,
    pub logo_template_url: Option<String>,
}

impl UpstreamGame {
    /// 仅包含名称和计数器的上游实体
    pub fn new(name: impl Into<String>, viewers: i64, channels: i64) -> Self {
        Self {
            name: name.into(),
            external_id: 0,
            popularity: None,
            viewers,
            channels,
            box_template_url: None,
            logo_template_url: None,
        }
    }
}

/// 上游返回的直播流摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub id: i64,
    pub game: String,
    pub channel: String,
    pub viewers: i64,
    pub preview_template_url: Option<String>,
}
