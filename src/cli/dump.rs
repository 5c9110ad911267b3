//! Dump subcommand: show one table through its schema.

use crate::context::AppContext;
use crate::error::LoadError;
use crate::tree::{TableTree, read_object, table_path};
use anyhow::{Result, anyhow};
use clap::Args;
use tracing::warn;

/// Arguments for the dump subcommand
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Package name
    pub package: String,

    /// Table name
    pub table: String,

    /// Print on one line instead of indented
    #[arg(long)]
    pub compact: bool,
}

/// Build the table's tree, fill it from its data file if one exists, and
/// render it.
pub fn render_table(ctx: &AppContext, package: &str, table: &str, compact: bool) -> Result<String> {
    let pkg = ctx
        .schemas
        .package(package)
        .ok_or_else(|| anyhow!("unknown package '{}'", package))?;
    let decl = pkg
        .graph
        .table(table)
        .ok_or_else(|| anyhow!("package '{}' has no table '{}'", package, table))?;

    let mut tree = TableTree::build(&pkg.graph, &pkg.name, decl);
    let path = table_path(&ctx.settings.data_path, &pkg.name, &decl.name);
    match read_object(&path) {
        Ok(rows) => tree.fill(&pkg.graph, &rows),
        Err(LoadError::NotFound { .. }) => {
            warn!("No data file for {}, showing defaults", tree.file_name());
            tree.materialize();
        }
        Err(e) => return Err(e.into()),
    }

    if compact {
        Ok(serde_json::to_string(&tree.to_value(&pkg.graph))?)
    } else {
        Ok(tree.to_json_pretty(&pkg.graph)?)
    }
}

/// Run the dump command.
pub fn run_dump(ctx: &AppContext, args: &DumpArgs) -> Result<()> {
    let text = render_table(ctx, &args.package, &args.table, args.compact)?;
    println!("{}", text);
    Ok(())
}
