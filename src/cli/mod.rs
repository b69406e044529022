//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use crate::service::GameSyncService;
use crate::telemetry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "gamesync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long,
        global = true,
        default_value = "gamesync.toml",
        help = "Path to the TOML configuration file"
    )]
    pub config: PathBuf,

    #[arg(long, global = true, default_value = telemetry::DEFAULT_FILTER, help = "Log filter")]
    pub log: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "sync", about = "Fetch upstream, reconcile, reset idle games and serve top games")]
    Sync(SyncArgs),

    #[command(name = "top", about = "Read the cached top games listing")]
    Top,

    #[command(name = "streams", about = "Read the cached streams listing for a game")]
    Streams(StreamsArgs),

    #[command(name = "invalidate", about = "Delete a cache key")]
    Invalidate(InvalidateArgs),

    #[command(name = "metrics", about = "Print process metrics")]
    Metrics(MetricsArgs),
}

#[derive(Parser, Debug)]
pub struct SyncArgs {
    #[arg(short, long, help = "Print the per-entity failures")]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
pub struct StreamsArgs {
    #[arg(short, long, help = "Game name")]
    pub game: String,
}

#[derive(Parser, Debug)]
pub struct InvalidateArgs {
    #[arg(short, long, default_value = crate::listing::TOP_GAMES_KEY, help = "Cache key")]
    pub key: String,

    #[arg(long, help = "Ask for confirmation before deleting")]
    pub confirm: bool,
}

#[derive(Parser, Debug)]
pub struct MetricsArgs {
    #[arg(long, help = "Run one sync before printing")]
    pub sync: bool,
}

mod admin;
mod listing;
mod metrics;
mod sync;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing("gamesync", &cli.log)?;

    let config = load_config(&cli.config)?;
    let result = match &cli.command {
        Commands::Sync(args) => sync::execute(&config, args).await,
        Commands::Top => listing::execute_top(&config).await,
        Commands::Streams(args) => listing::execute_streams(&config, args).await,
        Commands::Invalidate(args) => admin::execute_invalidate(&config, args).await,
        Commands::Metrics(args) => metrics::execute(&config, args).await,
    };

    telemetry::shutdown_tracing();
    result
}

/// 读取配置文件；文件不存在时使用默认值和环境变量
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let mut config = Config::default();
    config.apply_env();
    config.validate().context("Default configuration is invalid")?;
    Ok(config)
}

pub(crate) async fn connect(config: &Config) -> Result<GameSyncService> {
    GameSyncService::from_config(config)
        .await
        .context("Failed to assemble sync service")
}
