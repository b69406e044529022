//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内的游戏记录仓库，用于测试和单机试运行。

use super::{Comparator, Direction, FieldValue, GameField, GameQuery, GameRepository};
use crate::error::{Result, SyncError};
use crate::model::GameRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use tracing::{debug, instrument};

/// 内存游戏记录仓库
#[derive(Debug, Default)]
pub struct InMemoryGameRepository {
    records: DashMap<i64, GameRecord>,
    next_id: AtomicI64,
}

impl InMemoryGameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录总数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 所有记录按标识升序的快照
    pub fn snapshot(&self) -> Vec<GameRecord> {
        let mut all: Vec<GameRecord> = self.records.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|r| r.id);
        all
    }

    fn matches(record: &GameRecord, field: GameField, comparator: Comparator, value: &FieldValue) -> bool {
        let ordering = match (field, value) {
            (GameField::Name, FieldValue::Text(v)) => record.name.as_str().cmp(v.as_str()),
            (GameField::Viewers, FieldValue::Int(v)) => record.viewers.cmp(v),
            (GameField::Channels, FieldValue::Int(v)) => record.channels.cmp(v),
            (GameField::Popularity, FieldValue::Int(v)) => record.popularity.cmp(v),
            (GameField::UpdatedAt, FieldValue::Time(v)) => record.updated_at.cmp(v),
            _ => return false,
        };
        match comparator {
            Comparator::Eq => ordering == Ordering::Equal,
            Comparator::Le => ordering != Ordering::Greater,
        }
    }

    fn compare(a: &GameRecord, b: &GameRecord, field: GameField) -> Ordering {
        match field {
            GameField::Name => a.name.cmp(&b.name),
            GameField::Viewers => a.viewers.cmp(&b.viewers),
            GameField::Channels => a.channels.cmp(&b.channels),
            GameField::Popularity => a.popularity.cmp(&b.popularity),
            GameField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }

    fn name_taken_by_other(&self, name: &str, id: Option<i64>) -> bool {
        self.records
            .iter()
            .any(|e| e.value().name == name && Some(*e.key()) != id)
    }
}

#[async_trait]
impl GameRepository for InMemoryGameRepository {
    #[instrument(skip(self), level = "debug")]
    async fn query(&self, query: &GameQuery) -> Result<Vec<GameRecord>> {
        query.validate()?;

        let mut results: Vec<GameRecord> = self
            .records
            .iter()
            .map(|e| e.value().clone())
            .filter(|r| match &query.filter {
                Some(f) => Self::matches(r, f.field, f.comparator, &f.value),
                None => true,
            })
            .collect();

        results.sort_by(|a, b| {
            let primary = match query.order {
                Some((field, Direction::Asc)) => Self::compare(a, b, field),
                Some((field, Direction::Desc)) => Self::compare(b, a, field),
                None => Ordering::Equal,
            };
            primary.then_with(|| a.id.cmp(&b.id))
        });

        if let Some(limit) = query.limit {
            results.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        debug!("Memory query returned {} games", results.len());
        Ok(results)
    }

    #[instrument(skip(self, record), level = "debug", fields(name = %record.name, id = ?record.id))]
    async fn upsert(&self, mut record: GameRecord) -> Result<GameRecord> {
        if self.name_taken_by_other(&record.name, record.id) {
            return Err(SyncError::Conflict(format!(
                "game name '{}' already stored under another identity",
                record.name
            )));
        }

        let id = match record.id {
            Some(id) => {
                // 外部指定的标识也要推进序列，避免之后分配冲突
                self.next_id.fetch_max(id, AtomicOrdering::SeqCst);
                id
            }
            None => self.next_id.fetch_add(1, AtomicOrdering::SeqCst) + 1,
        };
        record.id = Some(id);
        self.records.insert(id, record.clone());
        Ok(record)
    }
}
