//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了游戏记录的持久化接口和查询模型。

pub mod entity;
pub mod memory;
pub mod sea_orm_repo;

use crate::error::{Result, SyncError};
use crate::model::GameRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryGameRepository;
pub use sea_orm_repo::SeaOrmGameRepository;

/// 可查询的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameField {
    Name,
    Viewers,
    Channels,
    Popularity,
    UpdatedAt,
}

/// 查询条件的取值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Time(DateTime<Utc>),
}

/// 比较运算符，存储后端只支持相等和小于等于
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// 单字段过滤条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: GameField,
    pub comparator: Comparator,
    pub value: FieldValue,
}

/// 查询描述
///
/// 至多一个过滤条件、一个排序子句和一个结果数量上限
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameQuery {
    pub filter: Option<Filter>,
    pub order: Option<(GameField, Direction)>,
    pub limit: Option<u64>,
}

impl GameQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: GameField, comparator: Comparator, value: FieldValue) -> Self {
        self.filter = Some(Filter {
            field,
            comparator,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: GameField, direction: Direction) -> Self {
        self.order = Some((field, direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 检查过滤值类型与字段是否匹配
    pub fn validate(&self) -> Result<()> {
        if let Some(filter) = &self.filter {
            let matches = matches!(
                (filter.field, &filter.value),
                (GameField::Name, FieldValue::Text(_))
                    | (
                        GameField::Viewers | GameField::Channels | GameField::Popularity,
                        FieldValue::Int(_)
                    )
                    | (GameField::UpdatedAt, FieldValue::Time(_))
            );
            if !matches {
                return Err(SyncError::MalformedInput(format!(
                    "filter value {:?} does not match field {:?}",
                    filter.value, filter.field
                )));
            }
        }

        if self.limit == Some(0) {
            return Err(SyncError::MalformedInput(
                "query limit cannot be zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// 游戏记录仓库
///
/// `upsert` 按存储标识覆盖，不按名称；更新路径上调用方需先用 `get_by_name` 解析标识。
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// 执行查询
    async fn query(&self, query: &GameQuery) -> Result<Vec<GameRecord>>;

    /// 写入记录
    ///
    /// 无标识时插入并分配标识；有标识时覆盖该标识下的值
    async fn upsert(&self, record: GameRecord) -> Result<GameRecord>;

    /// 按名称精确查找，至多一条；不存在不是错误
    async fn get_by_name(&self, name: &str) -> Result<Option<GameRecord>> {
        let query = GameQuery::new()
            .filter(
                GameField::Name,
                Comparator::Eq,
                FieldValue::Text(name.to_string()),
            )
            .limit(1);
        Ok(self.query(&query).await?.into_iter().next())
    }

    /// 按字段降序取前N条，并列顺序由存储决定
    async fn query_top(&self, field: GameField, limit: u64) -> Result<Vec<GameRecord>> {
        let query = GameQuery::new()
            .order_by(field, Direction::Desc)
            .limit(limit);
        self.query(&query).await
    }

    /// `updated_at <= cutoff` 的全部记录
    async fn updated_at_or_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<GameRecord>> {
        let query = GameQuery::new().filter(
            GameField::UpdatedAt,
            Comparator::Le,
            FieldValue::Time(cutoff),
        );
        self.query(&query).await
    }
}
