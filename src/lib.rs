//! gamesync - 上游榜单对账与读穿透缓存
//!
//! 从限流的上游接口拉取热门游戏快照，以有界并发写入持久化仓库，
//! 重置空闲记录的计数器，并通过带过期信封的读穿透缓存提供列表读取。

#![doc(html_root_url = "https://docs.rs/gamesync/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod repository;
pub mod service;
pub mod sync;
pub mod telemetry;
pub mod upstream;
pub mod utils;

// Re-export commonly used items
pub use cache::{CacheControl, CacheEnvelope, CacheStore};
pub use config::Config;
pub use error::{Result, SyncError};
pub use model::{GameRecord, StreamSummary, UpstreamGame};
pub use pipeline::{PipelineReport, PipelineStage, SyncPipeline};
pub use repository::{GameRepository, InMemoryGameRepository, SeaOrmGameRepository};
pub use service::GameSyncService;
pub use sync::{FanOut, IdleResetEngine, PassReport, ReconciliationEngine};

/// gamesync 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
