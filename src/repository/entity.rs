//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! `games` 表的Sea-ORM实体定义。

use crate::model::GameRecord;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub name: String,
    pub external_id: i64,
    pub popularity: i64,
    pub viewers: i64,
    pub channels: i64,
    pub box_template_url: String,
    pub logo_template_url: String,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for GameRecord {
    fn from(model: Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            external_id: model.external_id,
            popularity: model.popularity,
            viewers: model.viewers,
            channels: model.channels,
            box_template_url: model.box_template_url,
            logo_template_url: model.logo_template_url,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// 按后端生成建表语句
pub(crate) fn create_table_sql(backend: sea_orm::DatabaseBackend) -> Vec<&'static str> {
    match backend {
        sea_orm::DatabaseBackend::Sqlite => vec![
            "CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                external_id INTEGER NOT NULL DEFAULT 0,
                popularity INTEGER NOT NULL DEFAULT 0,
                viewers INTEGER NOT NULL DEFAULT 0,
                channels INTEGER NOT NULL DEFAULT 0,
                box_template_url TEXT NOT NULL DEFAULT '',
                logo_template_url TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_games_viewers ON games (viewers)",
            "CREATE INDEX IF NOT EXISTS idx_games_updated_at ON games (updated_at)",
        ],
        sea_orm::DatabaseBackend::Postgres => vec![
            "CREATE TABLE IF NOT EXISTS games (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                external_id BIGINT NOT NULL DEFAULT 0,
                popularity BIGINT NOT NULL DEFAULT 0,
                viewers BIGINT NOT NULL DEFAULT 0,
                channels BIGINT NOT NULL DEFAULT 0,
                box_template_url TEXT NOT NULL DEFAULT '',
                logo_template_url TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_games_viewers ON games (viewers)",
            "CREATE INDEX IF NOT EXISTS idx_games_updated_at ON games (updated_at)",
        ],
        sea_orm::DatabaseBackend::MySql => vec![
            "CREATE TABLE IF NOT EXISTS games (
                id BIGINT AUTO_INCREMENT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                external_id BIGINT NOT NULL DEFAULT 0,
                popularity BIGINT NOT NULL DEFAULT 0,
                viewers BIGINT NOT NULL DEFAULT 0,
                channels BIGINT NOT NULL DEFAULT 0,
                box_template_url TEXT NOT NULL,
                logo_template_url TEXT NOT NULL,
                created_at TIMESTAMP(6) NOT NULL,
                updated_at TIMESTAMP(6) NOT NULL,
                INDEX idx_games_viewers (viewers),
                INDEX idx_games_updated_at (updated_at)
            )",
        ],
    }
}
