//! Loadable config objects and the generic typed holder.

use crate::error::LoadError;
use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// An object backed by one data file.
pub trait ConfigObject: Send + Sync {
    /// Path of the backing file relative to the manager's base path.
    fn file_name(&self) -> &str;

    /// Decode `raw` into the active value and run the after-load hook.
    ///
    /// A value that decoded but failed its hook stays active; the error is
    /// still returned for logging.
    fn load_active(&self, raw: &[u8]) -> Result<(), LoadError>;
}

/// An object that can be reloaded without downtime.
pub trait ReloadableObject: ConfigObject {
    /// Decode `raw` into a fresh staging value and run the after-load hook
    /// against it. The active value is untouched.
    fn load_staging(&self, raw: &[u8]) -> Result<(), LoadError>;

    /// Publish the staging value as active in one swap.
    fn on_reload_finished(&self);
}

/// Typed table contents.
pub trait TableData: DeserializeOwned + Send + Sync + 'static {
    /// Post-load hook, run after decoding and before the value is published.
    fn after_load(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Typed holder for one data file: an atomically swapped active value and a
/// staging slot used during reload.
pub struct TableCell<T> {
    file_name: String,
    active: ArcSwap<T>,
    staging: Mutex<Option<T>>,
}

impl<T: TableData + Default> TableCell<T> {
    /// Holder whose active value is `T::default()` until loaded.
    pub fn new(file_name: impl Into<String>) -> Self {
        Self::with_value(file_name, T::default())
    }
}

impl<T: TableData> TableCell<T> {
    pub fn with_value(file_name: impl Into<String>, value: T) -> Self {
        Self {
            file_name: file_name.into(),
            active: ArcSwap::from_pointee(value),
            staging: Mutex::new(None),
        }
    }

    /// Snapshot of the active value. Never observes a half-built reload.
    pub fn get(&self) -> Arc<T> {
        self.active.load_full()
    }

    /// True while a reload has staged a value that was not yet published.
    pub fn has_staging(&self) -> bool {
        self.staging
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn decode(&self, raw: &[u8]) -> Result<T, LoadError> {
        serde_json::from_slice(raw).map_err(|source| LoadError::Decode {
            path: PathBuf::from(&self.file_name),
            source,
        })
    }

    fn hook_error(&self, source: anyhow::Error) -> LoadError {
        LoadError::AfterLoad {
            file: self.file_name.clone(),
            source,
        }
    }
}

impl<T: TableData> ConfigObject for TableCell<T> {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn load_active(&self, raw: &[u8]) -> Result<(), LoadError> {
        let mut value = self.decode(raw)?;
        let hook = value.after_load();
        self.active.store(Arc::new(value));
        hook.map_err(|e| self.hook_error(e))
    }
}

impl<T: TableData> ReloadableObject for TableCell<T> {
    fn load_staging(&self, raw: &[u8]) -> Result<(), LoadError> {
        let mut value = self.decode(raw)?;
        value.after_load().map_err(|e| self.hook_error(e))?;
        *self.staging.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
        Ok(())
    }

    fn on_reload_finished(&self) {
        let staged = self.staging.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(value) = staged {
            self.active.store(Arc::new(value));
        }
    }
}

/// Table contents without a generated type: the decoded top-level object.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(transparent)]
pub struct DynamicTable(pub Map<String, Value>);

impl DynamicTable {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }
}

impl TableData for DynamicTable {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize)]
    struct Limits {
        max: i64,
        #[serde(skip)]
        doubled: i64,
    }

    impl TableData for Limits {
        fn after_load(&mut self) -> anyhow::Result<()> {
            if self.max < 0 {
                anyhow::bail!("max must be non-negative");
            }
            self.doubled = self.max * 2;
            Ok(())
        }
    }

    #[test]
    fn test_load_active_runs_hook() {
        let cell: TableCell<Limits> = TableCell::new("p/Limits.json");
        cell.load_active(br#"{"max": 4}"#).unwrap();
        assert_eq!(cell.get().doubled, 8);
    }

    #[test]
    fn test_failed_hook_keeps_decoded_value() {
        let cell: TableCell<Limits> = TableCell::new("p/Limits.json");
        let err = cell.load_active(br#"{"max": -1}"#).unwrap_err();
        assert!(matches!(err, LoadError::AfterLoad { .. }));
        assert_eq!(cell.get().max, -1);
    }

    #[test]
    fn test_staging_is_invisible_until_published() {
        let cell: TableCell<Limits> = TableCell::new("p/Limits.json");
        cell.load_active(br#"{"max": 1}"#).unwrap();
        let before = cell.get();

        cell.load_staging(br#"{"max": 2}"#).unwrap();
        assert!(cell.has_staging());
        assert_eq!(cell.get().max, 1);

        cell.on_reload_finished();
        assert!(!cell.has_staging());
        assert_eq!(cell.get().max, 2);
        // Readers holding the old snapshot keep it intact.
        assert_eq!(before.max, 1);
    }

    #[test]
    fn test_rejected_staging_is_not_kept() {
        let cell: TableCell<Limits> = TableCell::new("p/Limits.json");
        assert!(cell.load_staging(br#"{"max": -5}"#).is_err());
        assert!(!cell.has_staging());
        cell.on_reload_finished();
        assert_eq!(cell.get().max, 0);
    }

    #[test]
    fn test_dynamic_table_requires_object() {
        let cell: TableCell<DynamicTable> = TableCell::new("p/T.json");
        cell.load_active(br#"{"name": "Ann"}"#).unwrap();
        assert_eq!(cell.get().get("name").unwrap(), "Ann");
        assert!(cell.load_active(b"[1]").is_err());
    }
}
