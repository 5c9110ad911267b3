//! Path helpers shared by schema discovery, data loading and change scanning.
//!
//! Tracked files are addressed by their path relative to a root directory,
//! always with forward slashes (`testpkg/TestTable.json`), so the same key
//! works on every platform and matches the names registered objects report.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Extension of runtime data files.
pub const DATA_EXTENSION: &str = "json";

/// Extensions accepted for schema documents.
pub const SCHEMA_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Recursively collect every file under `root` accepted by `filter`.
///
/// An unreadable root is an error. Unreadable subdirectories are logged and
/// skipped so one bad directory does not hide the rest of the tree.
pub fn walk_files(root: &Path, filter: impl Fn(&Path) -> bool) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut is_root = true;

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(e),
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                continue;
            }
        };
        is_root = false;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(t) => t,
                Err(_) => continue,
            };
            if file_type.is_dir() {
                pending.push(path);
            } else if filter(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// True when `path` has the given extension (case-sensitive).
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// True for data files (`*.json`).
pub fn is_data_file(path: &Path) -> bool {
    has_extension(path, DATA_EXTENSION)
}

/// True for schema documents (`*.yaml` / `*.yml`).
pub fn is_schema_file(path: &Path) -> bool {
    SCHEMA_EXTENSIONS.iter().any(|ext| has_extension(path, ext))
}

/// Key of `path` relative to `root`, joined with `/`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Relative file name of the data file backing `table` in `package`.
pub fn table_file_name(package: &str, table: &str) -> String {
    format!("{}/{}.{}", package, table, DATA_EXTENSION)
}
