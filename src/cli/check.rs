//! Check subcommand: validate schemas and data files.
//!
//! Unlike the registry loader, which stops at the first error, this reports
//! every problem it finds.

use crate::error::{ErrorCode, ErrorReport};
use crate::paths::{is_schema_file, relative_key, walk_files};
use crate::schema::{Package, PackageNames, load_package_file};
use crate::tree::{read_object, table_path};
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

/// Arguments for the check subcommand
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    pub format: CheckFormat,
}

/// Output format for check results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for CheckFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(CheckFormat::Text),
            "json" => Ok(CheckFormat::Json),
            _ => Err(format!("Invalid format '{}'. Valid options: text, json", s)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PackageSummary {
    pub package: String,
    pub file: String,
    pub enums: usize,
    pub structs: usize,
    pub tables: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct CheckOutcome {
    pub packages: Vec<PackageSummary>,
    pub errors: Vec<ErrorReport>,
}

impl CheckOutcome {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate every schema under `metadata_root`, then decode the existing data
/// file of every table of the valid packages.
pub fn check(metadata_root: &Path, data_root: &Path) -> Result<CheckOutcome> {
    let files = walk_files(metadata_root, is_schema_file)
        .with_context(|| format!("failed to read {}", metadata_root.display()))?;

    let mut outcome = CheckOutcome::default();
    let mut names = PackageNames::new();
    let mut valid: Vec<Package> = Vec::new();

    for path in files {
        let display = relative_key(metadata_root, &path)
            .unwrap_or_else(|| path.display().to_string());
        match load_package_file(&path) {
            Ok(package) => {
                if let Err(err) = names.claim(&package.name, &path) {
                    outcome.errors.push(ErrorReport::from(&err).with_file(display));
                    continue;
                }
                outcome.packages.push(PackageSummary {
                    package: package.name.clone(),
                    file: display,
                    enums: package.graph.enums().count(),
                    structs: package.graph.structs().count(),
                    tables: package.graph.tables().count(),
                });
                valid.push(package);
            }
            Err(e) => outcome.errors.push(ErrorReport::from(&e).with_file(display)),
        }
    }

    for package in &valid {
        for table in package.graph.tables() {
            let path = table_path(data_root, &package.name, &table.name);
            if !path.is_file() {
                continue;
            }
            if let Err(e) = read_object(&path) {
                let display = relative_key(data_root, &path)
                    .unwrap_or_else(|| path.display().to_string());
                outcome
                    .errors
                    .push(ErrorReport::new(e.code(), e.to_string()).with_file(display));
            }
        }
    }

    Ok(outcome)
}

/// Run the check command. Returns whether everything validated.
pub fn run_check(args: &CheckArgs, metadata_root: &Path, data_root: &Path) -> Result<bool> {
    let outcome = check(metadata_root, data_root)?;
    match args.format {
        CheckFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        CheckFormat::Text => print_text(&outcome),
    }
    Ok(outcome.is_ok())
}

fn print_text(outcome: &CheckOutcome) {
    for summary in &outcome.packages {
        println!(
            "ok    {} ({}): {} enums, {} structs, {} tables",
            summary.package, summary.file, summary.enums, summary.structs, summary.tables
        );
    }
    for report in &outcome.errors {
        println!(
            "error {} [{}]: {}",
            report.file.as_deref().unwrap_or("-"),
            code_name(report.code),
            report.message
        );
    }
    if outcome.is_ok() {
        println!("{} packages valid", outcome.packages.len());
    } else {
        println!("{} problems found", outcome.errors.len());
    }
}

fn code_name(code: ErrorCode) -> String {
    serde_json::to_value(code)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{code:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn layout() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().unwrap();
        let meta = temp.path().join("metadata");
        let data = temp.path().join("data");
        fs::create_dir_all(&meta).unwrap();
        fs::create_dir_all(data.join("shop")).unwrap();
        (temp, meta, data)
    }

    #[test]
    fn test_reports_every_problem() {
        let (_temp, meta, data) = layout();
        fs::write(
            meta.join("shop.yaml"),
            "package: shop\ntables:\n  - name: Item\n    fields:\n      - { name: price, type: int }\n",
        )
        .unwrap();
        fs::write(
            meta.join("broken.yaml"),
            "package: broken\nstructs:\n  - name: A\n    fields:\n      - { name: b, type: Missing }\n",
        )
        .unwrap();
        fs::write(meta.join("zz_again.yaml"), "package: shop\n").unwrap();
        fs::write(data.join("shop/Item.json"), "{ nope").unwrap();

        let outcome = check(&meta, &data).unwrap();
        assert_eq!(outcome.packages.len(), 1);
        let codes: Vec<ErrorCode> = outcome.errors.iter().map(|r| r.code).collect();
        assert!(codes.contains(&ErrorCode::UnresolvedType));
        assert!(codes.contains(&ErrorCode::DuplicatePackage));
        assert!(codes.contains(&ErrorCode::MalformedJson));
        assert!(!outcome.is_ok());
    }

    #[test]
    fn test_clean_tree_is_ok() {
        let (_temp, meta, data) = layout();
        fs::write(meta.join("shop.yaml"), "package: shop\n").unwrap();
        let outcome = check(&meta, &data).unwrap();
        assert!(outcome.is_ok());
        assert_eq!(code_name(ErrorCode::MalformedJson), "MALFORMED_JSON");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<CheckFormat>().unwrap(), CheckFormat::Json);
        assert!("yaml".parse::<CheckFormat>().is_err());
    }
}
