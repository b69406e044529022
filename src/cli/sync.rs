//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了同步命令的实现。

use crate::cli::{connect, listing::print_listing, SyncArgs};
use crate::config::Config;
use anyhow::Result;

pub async fn execute(config: &Config, args: &SyncArgs) -> Result<()> {
    let service = connect(config).await?;
    let report = service.pipeline().run().await?;

    eprintln!("=== Sync Report ===");
    eprintln!("Synced at:       {}", report.synced_at.to_rfc3339());
    eprintln!("Persisted:       {}", report.reconcile.persisted());
    eprintln!("Failed:          {}", report.reconcile.pass.failed());
    eprintln!("Duplicates:      {}", report.reconcile.duplicates_skipped);
    match &report.reset {
        Some(reset) => eprintln!("Idle reset:      {} ({} failed)", reset.succeeded(), reset.failed()),
        None => eprintln!("Idle reset:      skipped"),
    }

    if args.verbose {
        let failures = report
            .reconcile
            .pass
            .failures
            .iter()
            .chain(report.reset.iter().flat_map(|r| r.failures.iter()));
        for failure in failures {
            eprintln!("  {:?} {}: {}", failure.kind, failure.key, failure.error);
        }
    }
    eprintln!();

    print_listing(&report.listing)
}
