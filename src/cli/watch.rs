//! Watch subcommand: load every table and hot-reload until interrupted.

use crate::context::AppContext;
use crate::watcher::ChangeWatcher;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Run the watch command until Ctrl-C.
pub async fn run_watch(ctx: &AppContext) -> Result<()> {
    let cells = ctx.register_tables();
    let manager = Arc::clone(&ctx.manager);
    let loaded = tokio::task::spawn_blocking(move || manager.load_all()).await?;
    if loaded < cells.len() {
        warn!(loaded, total = cells.len(), "Some tables failed to load");
    }

    let handle = ChangeWatcher::start(Arc::clone(&ctx.manager), ctx.watcher_config())
        .context("failed to start change watcher")?;

    let mut reports = handle.reports();
    let printer = tokio::spawn(async move {
        while reports.changed().await.is_ok() {
            let report = reports.borrow_and_update().clone();
            let Some(report) = report else { continue };
            for file in &report.reloaded {
                println!("reloaded {}", file);
            }
            for (file, reason) in &report.failed {
                println!("failed   {}: {}", file, reason);
            }
        }
    });

    println!(
        "Watching {} tables under {} (Ctrl-C to stop)",
        cells.len(),
        ctx.settings.data_path.display()
    );
    tokio::signal::ctrl_c().await?;
    info!("Interrupted, stopping watcher");

    handle.stop().await;
    printer.abort();
    Ok(())
}
