//! Untyped data files under the data root.

use crate::error::LoadError;
use crate::paths::{is_data_file, walk_files};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Decoded data files, keyed by package (parent directory name) then table
/// (file stem).
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    tables: BTreeMap<String, BTreeMap<String, Map<String, Value>>>,
}

impl DataSet {
    /// Decode every `<package>/<table>.json` under `root`.
    ///
    /// An unreadable root is an error. A single unreadable or malformed file
    /// is logged and skipped.
    pub fn load(root: &Path) -> io::Result<Self> {
        let mut set = DataSet::default();
        for path in walk_files(root, is_data_file)? {
            let Some((package, table)) = table_key(&path) else {
                continue;
            };
            match read_object(&path) {
                Ok(rows) => {
                    debug!(package = %package, table = %table, "Loaded data file");
                    set.insert(package, table, rows);
                }
                Err(e) => warn!("Skipping data file: {}", e),
            }
        }
        Ok(set)
    }

    pub fn insert(&mut self, package: impl Into<String>, table: impl Into<String>, rows: Map<String, Value>) {
        self.tables
            .entry(package.into())
            .or_default()
            .insert(table.into(), rows);
    }

    pub fn table(&self, package: &str, table: &str) -> Option<&Map<String, Value>> {
        self.tables.get(package)?.get(table)
    }

    pub fn packages(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of decoded files.
    pub fn len(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read one data file as a JSON object.
pub fn read_object(path: &Path) -> Result<Map<String, Value>, LoadError> {
    let raw = std::fs::read(path).map_err(|e| LoadError::from_io(path.to_path_buf(), e))?;
    serde_json::from_slice(&raw).map_err(|source| LoadError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn table_key(path: &Path) -> Option<(String, String)> {
    let package = path.parent()?.file_name()?.to_str()?.to_string();
    let table = path.file_stem()?.to_str()?.to_string();
    Some((package, table))
}

/// Path of `<root>/<package>/<table>.json`.
pub fn table_path(root: &Path, package: &str, table: &str) -> PathBuf {
    root.join(crate::paths::table_file_name(package, table))
}
