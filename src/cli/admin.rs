//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了管理员操作命令的实现。

use crate::cli::{connect, InvalidateArgs};
use crate::config::Config;
use anyhow::Result;
use std::io::Write;

pub async fn execute_invalidate(config: &Config, args: &InvalidateArgs) -> Result<()> {
    if args.confirm {
        print!("Delete cache key '{}'? [y/N]: ", args.key);
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "y" {
            println!("Operation cancelled.");
            return Ok(());
        }
    }

    let service = connect(config).await?;
    service.listings().cache().invalidate(&args.key).await?;
    println!("Cache key '{}' invalidated.", args.key);
    Ok(())
}
