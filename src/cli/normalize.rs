//! Normalize subcommand: rewrite data files through their schemas.
//!
//! Each existing data file is filled into its table tree and written back,
//! which drops unknown keys and applies scalar fallbacks. With `--defaults`,
//! missing fields are written out with their defaults too. Files already in
//! normal form are left untouched.

use crate::context::AppContext;
use crate::tree::{TableTree, read_object};
use anyhow::{Result, anyhow};
use clap::Args;
use tracing::{info, warn};

/// Arguments for the normalize subcommand
#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Only normalize this package
    #[arg(short, long)]
    pub package: Option<String>,

    /// Show which files would change without writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Write fields missing from the data with their default values
    #[arg(long)]
    pub defaults: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    /// Files rewritten, or that would be rewritten in a dry run.
    pub changed: Vec<String>,
    pub unchanged: usize,
    /// Files that could not be read or decoded.
    pub skipped: Vec<String>,
}

pub fn normalize(ctx: &AppContext, args: &NormalizeArgs) -> Result<NormalizeSummary> {
    if let Some(name) = &args.package
        && ctx.schemas.package(name).is_none()
    {
        return Err(anyhow!("unknown package '{}'", name));
    }

    let data_root = &ctx.settings.data_path;
    let mut summary = NormalizeSummary::default();

    for pkg in ctx.schemas.packages() {
        if args.package.as_ref().is_some_and(|p| *p != pkg.name) {
            continue;
        }
        for decl in pkg.graph.tables() {
            let mut tree = TableTree::build(&pkg.graph, &pkg.name, decl);
            let path = tree.data_path(data_root);
            if !path.is_file() {
                continue;
            }

            let rows = match read_object(&path) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("Skipping {}: {}", tree.file_name(), e);
                    summary.skipped.push(tree.file_name());
                    continue;
                }
            };
            tree.fill(&pkg.graph, &rows);
            if args.defaults {
                tree.materialize();
            }

            let current = std::fs::read_to_string(&path)?;
            let normalized = tree.to_json_pretty(&pkg.graph)?;
            if current == normalized {
                summary.unchanged += 1;
                continue;
            }

            if !args.dry_run {
                tree.save(&pkg.graph, data_root)?;
                info!(file = %tree.file_name(), "Normalized data file");
            }
            summary.changed.push(tree.file_name());
        }
    }
    Ok(summary)
}

/// Run the normalize command.
pub fn run_normalize(ctx: &AppContext, args: &NormalizeArgs) -> Result<()> {
    let summary = normalize(ctx, args)?;
    let verb = if args.dry_run { "would rewrite" } else { "rewrote" };
    for file in &summary.changed {
        println!("{} {}", verb, file);
    }
    for file in &summary.skipped {
        println!("skipped {}", file);
    }
    println!(
        "{} changed, {} unchanged, {} skipped",
        summary.changed.len(),
        summary.unchanged,
        summary.skipped.len()
    );
    Ok(())
}
