//! CLI command definitions for tablecfg
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod check;
pub mod dump;
pub mod normalize;
pub mod watch;

use check::CheckArgs;
use clap::{Parser, Subcommand};
use dump::DumpArgs;
use normalize::NormalizeArgs;
use std::path::PathBuf;

/// Schema-typed table configuration tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a settings file (overrides conf.yaml lookup)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Schema root directory (overrides settings)
    #[arg(short, long, global = true)]
    pub metadata: Option<PathBuf>,

    /// Data root directory (overrides settings)
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate every schema and every existing data file
    Check(CheckArgs),

    /// Print one table's data as seen through its schema
    Dump(DumpArgs),

    /// Rewrite data files through their schemas
    Normalize(NormalizeArgs),

    /// Load every table and hot-reload changes until interrupted
    Watch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dump_with_global_flags() {
        let cli = Cli::try_parse_from([
            "tablecfg", "dump", "shop", "Item", "--data", "/srv/data", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.data, Some(PathBuf::from("/srv/data")));
        assert_eq!(cli.log, "2");
        match cli.command {
            Command::Dump(args) => {
                assert_eq!(args.package, "shop");
                assert_eq!(args.table, "Item");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_normalize_flags() {
        let cli =
            Cli::try_parse_from(["tablecfg", "normalize", "--package", "shop", "--dry-run"]).unwrap();
        match cli.command {
            Command::Normalize(args) => {
                assert_eq!(args.package.as_deref(), Some("shop"));
                assert!(args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["tablecfg"]).is_err());
    }
}
