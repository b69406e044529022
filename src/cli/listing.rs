//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了列表读取命令的实现。

use crate::cli::{connect, StreamsArgs};
use crate::config::Config;
use crate::listing::Listing;
use anyhow::Result;

pub async fn execute_top(config: &Config) -> Result<()> {
    let service = connect(config).await?;
    let listing = service.listings().top_games().await?;
    print_listing(&listing)
}

pub async fn execute_streams(config: &Config, args: &StreamsArgs) -> Result<()> {
    let service = connect(config).await?;
    let listing = service.listings().streams(&args.game).await?;
    print_listing(&listing)
}

/// 先打印响应头再打印正文
pub(crate) fn print_listing(listing: &Listing) -> Result<()> {
    println!("Content-Type: application/json");
    if let Some(control) = &listing.cache_control {
        println!("Cache-Control: {}", control.header_value());
        println!("Expires: {}", control.expires);
    }
    println!();
    println!("{}", listing.body()?);
    Ok(())
}
