//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基于Sea-ORM的游戏记录仓库。

use super::entity::{self, ActiveModel, Column, Entity};
use super::{Comparator, Direction, FieldValue, GameField, GameQuery, GameRepository};
use crate::config::DatabaseConfig;
use crate::error::{Result, SyncError};
use crate::model::GameRecord;
use crate::utils::redaction::redact_connection_string;
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, NotSet, Order, QueryFilter, QueryOrder, QuerySelect, Set, Statement, Value,
};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Sea-ORM游戏记录仓库
///
/// 支持PostgreSQL、MySQL和SQLite
#[derive(Debug, Clone)]
pub struct SeaOrmGameRepository {
    connection: DatabaseConnection,
}

impl SeaOrmGameRepository {
    /// 连接数据库并确保表结构存在
    #[instrument(skip(config), level = "info", name = "init_game_repository")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let connection_string = config.connection_string.expose_secret();
        info!(
            "Connecting to database: {}",
            redact_connection_string(connection_string)
        );

        let mut opt = ConnectOptions::new(connection_string.to_string());
        opt.max_connections(config.max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let connection = Database::connect(opt).await.map_err(|e| {
            SyncError::BackendUnavailable(format!("Failed to open database: {}", e))
        })?;

        let repo = Self::from_connection(connection);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// 使用已有连接创建仓库，不做建表
    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// 建表（幂等）
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.connection.get_database_backend();
        for sql in entity::create_table_sql(backend) {
            debug!("Executing schema statement: {}", sql);
            self.connection
                .execute(Statement::from_string(backend, sql.to_string()))
                .await?;
        }
        Ok(())
    }

    fn column(field: GameField) -> Column {
        match field {
            GameField::Name => Column::Name,
            GameField::Viewers => Column::Viewers,
            GameField::Channels => Column::Channels,
            GameField::Popularity => Column::Popularity,
            GameField::UpdatedAt => Column::UpdatedAt,
        }
    }

    fn value(value: &FieldValue) -> Value {
        match value {
            FieldValue::Text(v) => v.clone().into(),
            FieldValue::Int(v) => (*v).into(),
            FieldValue::Time(v) => (*v).into(),
        }
    }

    fn active_model(record: &GameRecord) -> ActiveModel {
        ActiveModel {
            id: match record.id {
                Some(id) => Set(id),
                None => NotSet,
            },
            name: Set(record.name.clone()),
            external_id: Set(record.external_id),
            popularity: Set(record.popularity),
            viewers: Set(record.viewers),
            channels: Set(record.channels),
            box_template_url: Set(record.box_template_url.clone()),
            logo_template_url: Set(record.logo_template_url.clone()),
            created_at: Set(record.created_at),
            updated_at: Set(record.updated_at),
        }
    }
}

#[async_trait]
impl GameRepository for SeaOrmGameRepository {
    #[instrument(skip(self), level = "debug")]
    async fn query(&self, query: &GameQuery) -> Result<Vec<GameRecord>> {
        query.validate()?;

        let mut select = Entity::find();

        if let Some(filter) = &query.filter {
            let column = Self::column(filter.field);
            let value = Self::value(&filter.value);
            select = match filter.comparator {
                Comparator::Eq => select.filter(column.eq(value)),
                Comparator::Le => select.filter(column.lte(value)),
            };
        }

        if let Some((field, direction)) = query.order {
            let order = match direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            select = select.order_by(Self::column(field), order);
        }
        select = select.order_by(Column::Id, Order::Asc);

        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        let models = select.all(&self.connection).await?;
        debug!("Query returned {} games", models.len());
        Ok(models.into_iter().map(GameRecord::from).collect())
    }

    #[instrument(skip(self, record), level = "debug", fields(name = %record.name, id = ?record.id))]
    async fn upsert(&self, record: GameRecord) -> Result<GameRecord> {
        let model = Self::active_model(&record);

        match record.id {
            None => {
                let inserted = model.insert(&self.connection).await?;
                debug!("Inserted game: name={}, id={}", inserted.name, inserted.id);
                Ok(inserted.into())
            }
            Some(id) => {
                // 按标识整体覆盖，标识不存在时写入该标识
                Entity::insert(model)
                    .on_conflict(
                        OnConflict::column(Column::Id)
                            .update_columns([
                                Column::Name,
                                Column::ExternalId,
                                Column::Popularity,
                                Column::Viewers,
                                Column::Channels,
                                Column::BoxTemplateUrl,
                                Column::LogoTemplateUrl,
                                Column::CreatedAt,
                                Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(&self.connection)
                    .await?;
                debug!("Overwrote game: name={}, id={}", record.name, id);
                Ok(record)
            }
        }
    }
}
