//! Package discovery and the merged package registry.
//!
//! Discovery parses one schema file per blocking task. Results are merged into
//! a shared map under a single writer lock. The merged map is only reachable
//! through [`PendingSchemas::wait`], which returns once every task of the load
//! cycle has finished, so no reader can observe a half-merged registry.

use super::parse::parse_package;
use super::types::Package;
use crate::error::SchemaError;
use crate::paths::{is_schema_file, walk_files};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Read and parse one schema file.
pub fn load_package_file(path: &Path) -> Result<Package, SchemaError> {
    let raw = std::fs::read(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_package(&raw)
}

/// Where each package name was first defined during one load cycle.
#[derive(Debug, Default)]
pub struct PackageNames {
    first: BTreeMap<String, PathBuf>,
}

impl PackageNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` defines `name`. A second definition of the same
    /// name is rejected with both paths.
    pub fn claim(&mut self, name: &str, path: &Path) -> Result<(), SchemaError> {
        if let Some(first) = self.first.get(name) {
            return Err(SchemaError::DuplicatePackage {
                name: name.to_string(),
                first: first.clone(),
                second: path.to_path_buf(),
            });
        }
        self.first.insert(name.to_string(), path.to_path_buf());
        Ok(())
    }
}

#[derive(Default)]
struct MergedPackages {
    names: PackageNames,
    packages: BTreeMap<String, Arc<Package>>,
}

/// A load cycle whose discovery tasks may still be running.
pub struct PendingSchemas {
    root: PathBuf,
    tasks: JoinSet<Result<(), SchemaError>>,
    merged: Arc<Mutex<MergedPackages>>,
}

impl PendingSchemas {
    /// Discover schema files under `root` and start one parse task per file.
    ///
    /// Must be called from within a tokio runtime. An unreadable root fails
    /// immediately.
    pub fn spawn(root: &Path) -> Result<Self, SchemaError> {
        let files = walk_files(root, is_schema_file).map_err(|source| SchemaError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let merged: Arc<Mutex<MergedPackages>> = Arc::default();
        let mut tasks = JoinSet::new();

        for path in files {
            let merged = Arc::clone(&merged);
            tasks.spawn_blocking(move || {
                let package = load_package_file(&path)?;
                debug!(package = %package.name, types = package.graph.len(), "Loaded schema {}", path.display());

                let mut merged = merged.lock().unwrap_or_else(|e| e.into_inner());
                merged.names.claim(&package.name, &path)?;
                merged.packages.insert(package.name.clone(), Arc::new(package));
                Ok(())
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            tasks,
            merged,
        })
    }

    /// Number of discovery tasks not yet collected.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every discovery task, then publish the merged registry.
    ///
    /// Fails with the first error any task reports. Remaining tasks are
    /// aborted and nothing is published.
    pub async fn wait(mut self) -> Result<SchemaRegistry, SchemaError> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(_) => {}
            }
        }

        let packages = std::mem::take(&mut self.merged.lock().unwrap_or_else(|e| e.into_inner()).packages);

        info!(
            root = %self.root.display(),
            packages = packages.len(),
            "Schema registry ready"
        );
        Ok(SchemaRegistry { packages })
    }
}

/// Validated packages, keyed by package name. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    packages: BTreeMap<String, Arc<Package>>,
}

impl SchemaRegistry {
    /// Discover and validate every schema under `root`.
    pub async fn load_dir(root: &Path) -> Result<Self, SchemaError> {
        PendingSchemas::spawn(root)?.wait().await
    }

    /// Build a registry from already validated packages.
    pub fn from_packages(packages: impl IntoIterator<Item = Package>) -> Result<Self, SchemaError> {
        let mut names = PackageNames::new();
        let mut map = BTreeMap::new();
        for package in packages {
            names.claim(&package.name, Path::new(""))?;
            map.insert(package.name.clone(), Arc::new(package));
        }
        Ok(Self { packages: map })
    }

    pub fn package(&self, name: &str) -> Option<&Arc<Package>> {
        self.packages.get(name)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.packages.values()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
