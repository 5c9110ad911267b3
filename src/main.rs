//! tablecfg
//!
//! Validates table schemas, inspects and normalizes data files, and
//! hot-reloads them while they are edited.

use anyhow::Result;
use clap::Parser;
use tablecfg::cli::check::run_check;
use tablecfg::cli::dump::run_dump;
use tablecfg::cli::normalize::run_normalize;
use tablecfg::cli::watch::run_watch;
use tablecfg::cli::{Cli, Command};
use tablecfg::config::{ConfigLoader, Settings};
use tablecfg::context::AppContext;
use tablecfg::logging::{self, LogTarget};
use tracing::debug;

/// Load settings from every tier, then apply command-line overrides.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let loader = ConfigLoader::load(cli.config.clone())?;
    for (tier, path) in loader.sources() {
        debug!(tier = %tier, path = ?path, "Settings source");
    }
    let mut settings = loader.into_settings();
    if let Some(metadata) = &cli.metadata {
        settings.metadata_path = metadata.clone();
    }
    if let Some(data) = &cli.data {
        settings.data_path = data.clone();
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let settings = load_settings(&cli)?;
    debug!(?settings, "Effective settings");

    match &cli.command {
        Command::Check(args) => {
            let ok = run_check(args, &settings.metadata_path, &settings.data_path)?;
            if !ok {
                std::process::exit(1);
            }
        }
        Command::Dump(args) => {
            let ctx = AppContext::init(settings).await?;
            run_dump(&ctx, args)?;
        }
        Command::Normalize(args) => {
            let ctx = AppContext::init(settings).await?;
            run_normalize(&ctx, args)?;
        }
        Command::Watch => {
            let ctx = AppContext::init(settings).await?;
            run_watch(&ctx).await?;
        }
    }
    Ok(())
}
