//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了指标查询命令的实现。

use crate::cli::{connect, MetricsArgs};
use crate::config::Config;
use crate::metrics::render_metrics;
use anyhow::Result;

pub async fn execute(config: &Config, args: &MetricsArgs) -> Result<()> {
    if args.sync {
        let service = connect(config).await?;
        service.pipeline().run().await?;
    }

    let output = render_metrics();
    if output.is_empty() {
        println!("No metrics recorded in this process.");
    } else {
        print!("{}", output);
    }
    Ok(())
}
