//! Process-wide state, built once at startup and passed explicitly.

use crate::config::Settings;
use crate::manager::{ConfigManager, DynamicTable, TableCell};
use crate::paths::table_file_name;
use crate::schema::SchemaRegistry;
use crate::tree::{DataSet, TableTree};
use crate::watcher::WatcherConfig;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub struct AppContext {
    pub settings: Settings,
    pub schemas: Arc<SchemaRegistry>,
    pub manager: Arc<ConfigManager>,
}

impl AppContext {
    /// Load every schema under the metadata root and create the manager for
    /// the data root. Nothing is registered yet.
    pub async fn init(settings: Settings) -> Result<Self> {
        let schemas = SchemaRegistry::load_dir(&settings.metadata_path)
            .await
            .with_context(|| {
                format!(
                    "failed to load schemas from {}",
                    settings.metadata_path.display()
                )
            })?;
        info!(
            packages = schemas.len(),
            metadata_path = %settings.metadata_path.display(),
            "Schemas loaded"
        );
        let manager = Arc::new(ConfigManager::new(&settings.data_path));
        Ok(Self {
            settings,
            schemas: Arc::new(schemas),
            manager,
        })
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        self.settings.watcher_config()
    }

    /// Register every table of every package as a reloadable untyped object,
    /// keyed by its data file name.
    pub fn register_tables(&self) -> BTreeMap<String, Arc<TableCell<DynamicTable>>> {
        let mut cells = BTreeMap::new();
        for package in self.schemas.packages() {
            for table in package.graph.tables() {
                let file_name = table_file_name(&package.name, &table.name);
                let cell = Arc::new(TableCell::<DynamicTable>::new(file_name.clone()));
                self.manager.register_reloadable(cell.clone());
                cells.insert(file_name, cell);
            }
        }
        cells
    }

    /// Decode every data file and build a filled tree per table.
    pub fn load_trees(&self) -> Result<BTreeMap<String, BTreeMap<String, TableTree>>> {
        let data = DataSet::load(&self.settings.data_path).with_context(|| {
            format!(
                "failed to read data from {}",
                self.settings.data_path.display()
            )
        })?;
        Ok(TableTree::build_all(&self.schemas, &data))
    }
}
