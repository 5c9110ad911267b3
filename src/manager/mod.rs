//! Registry of loadable config objects with dirty tracking and hot reload.
//!
//! Objects are registered once with their capability fixed at registration
//! time. [`ConfigManager::rescan`] diffs file modification times under the
//! base path; [`ConfigManager::reload_file`] decodes a dirty file into the
//! object's staging slot and publishes it in one swap, or leaves the active
//! value untouched and the file dirty on failure.

mod object;
mod scan;

pub use object::{ConfigObject, DynamicTable, ReloadableObject, TableCell, TableData};
pub use scan::ModTimeScanner;

use crate::error::{LoadError, ReloadError};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What a registered object can do, resolved when it is registered.
#[derive(Clone)]
pub enum Capability {
    LoadOnly(Arc<dyn ConfigObject>),
    Reloadable(Arc<dyn ReloadableObject>),
}

impl Capability {
    fn file_name(&self) -> &str {
        match self {
            Capability::LoadOnly(obj) => obj.file_name(),
            Capability::Reloadable(obj) => obj.file_name(),
        }
    }

    fn load_active(&self, raw: &[u8]) -> Result<(), LoadError> {
        match self {
            Capability::LoadOnly(obj) => obj.load_active(raw),
            Capability::Reloadable(obj) => obj.load_active(raw),
        }
    }

    pub fn is_reloadable(&self) -> bool {
        matches!(self, Capability::Reloadable(_))
    }
}

struct Registration {
    capability: Capability,
    // Reloads of one file run one at a time.
    reload_lock: Mutex<()>,
}

pub struct ConfigManager {
    base_path: PathBuf,
    registry: RwLock<HashMap<String, Arc<Registration>>>,
    scanner: Mutex<ModTimeScanner>,
}

impl ConfigManager {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            registry: RwLock::new(HashMap::new()),
            scanner: Mutex::new(ModTimeScanner::new()),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Record the current modification times of every data file.
    ///
    /// Returns the number of tracked files. An unreadable base path is an error.
    pub fn start(&self) -> io::Result<usize> {
        let tracked = self.lock_scanner().prime(&self.base_path)?;
        info!(
            base_path = %self.base_path.display(),
            tracked,
            "Config manager started"
        );
        Ok(tracked)
    }

    /// Register an object that is loaded once and never reloaded.
    pub fn register_static(&self, obj: Arc<dyn ConfigObject>) {
        self.insert(Capability::LoadOnly(obj));
    }

    /// Register an object that supports staging and atomic publish.
    pub fn register_reloadable(&self, obj: Arc<dyn ReloadableObject>) {
        self.insert(Capability::Reloadable(obj));
    }

    fn insert(&self, capability: Capability) {
        let key = normalize_key(capability.file_name());
        let registration = Arc::new(Registration {
            capability,
            reload_lock: Mutex::new(()),
        });
        let mut registry = self.registry.write().unwrap_or_else(|e| e.into_inner());
        if registry.insert(key.clone(), registration).is_some() {
            warn!(file = %key, "Replacing existing registration");
        } else {
            debug!(file = %key, "Registered config object");
        }
    }

    /// Registered file names, sorted.
    pub fn registered(&self) -> Vec<String> {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = registry.keys().cloned().collect();
        names.sort();
        names
    }

    /// Capability of a registered file.
    pub fn capability(&self, file_name: &str) -> Option<Capability> {
        self.registration(file_name).map(|r| r.capability.clone())
    }

    fn registration(&self, file_name: &str) -> Option<Arc<Registration>> {
        let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
        registry.get(&normalize_key(file_name)).cloned()
    }

    fn read(&self, file_name: &str) -> Result<Vec<u8>, LoadError> {
        let path = self.base_path.join(file_name);
        std::fs::read(&path).map_err(|e| LoadError::from_io(path, e))
    }

    /// Decode the object's file straight into its active value.
    ///
    /// Failures are logged here; the object keeps whatever decoding produced.
    pub fn load_file(&self, obj: &dyn ConfigObject) -> Result<(), LoadError> {
        let file_name = obj.file_name();
        let result = self.read(file_name).and_then(|raw| obj.load_active(&raw));
        match &result {
            Ok(()) => debug!(file = %file_name, "Loaded config file"),
            Err(e) => error!(file = %file_name, code = ?e.code(), "Load failed: {}", e),
        }
        result
    }

    /// Load every registered object. Returns how many loaded cleanly.
    pub fn load_all(&self) -> usize {
        let registrations: Vec<Arc<Registration>> = {
            let registry = self.registry.read().unwrap_or_else(|e| e.into_inner());
            registry.values().cloned().collect()
        };
        let mut loaded = 0;
        for registration in &registrations {
            let capability = &registration.capability;
            let file_name = capability.file_name();
            let result = self
                .read(file_name)
                .and_then(|raw| capability.load_active(&raw));
            match result {
                Ok(()) => loaded += 1,
                Err(e) => error!(file = %file_name, code = ?e.code(), "Load failed: {}", e),
            }
        }
        info!(loaded, total = registrations.len(), "Loaded config objects");
        loaded
    }

    /// Reload one registered file into its staging slot and publish it.
    ///
    /// On success the file's dirty flag is cleared, unless a scan recorded a
    /// newer write while the reload ran. On failure the active value is
    /// untouched and the flag stays set.
    pub fn reload_file(&self, file_name: &str) -> Result<(), ReloadError> {
        let registration = self
            .registration(file_name)
            .ok_or_else(|| ReloadError::NotRegistered(file_name.to_string()))?;
        let Capability::Reloadable(obj) = &registration.capability else {
            return Err(ReloadError::NotReloadable(file_name.to_string()));
        };

        let key = normalize_key(file_name);
        let _guard = registration
            .reload_lock
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let seen_at = self.lock_scanner().modified(&key);
        let raw = self.read(obj.file_name())?;
        obj.load_staging(&raw)?;
        obj.on_reload_finished();

        if self.lock_scanner().clear_if_unchanged(&key, seen_at) {
            info!(file = %file_name, "Reloaded config file");
        } else {
            info!(file = %file_name, "Reloaded config file; it changed again and stays dirty");
        }
        Ok(())
    }

    /// Diff modification times against the last scan. Returns newly dirty files.
    pub fn rescan(&self) -> io::Result<Vec<String>> {
        let changed = self.lock_scanner().rescan(&self.base_path)?;
        if !changed.is_empty() {
            debug!(files = ?changed, "Config files changed");
        }
        Ok(changed)
    }

    pub fn is_dirty(&self, file_name: &str) -> bool {
        self.lock_scanner().is_dirty(&normalize_key(file_name))
    }

    pub fn dirty_files(&self) -> Vec<String> {
        self.lock_scanner().dirty_files()
    }

    /// Drop `file_name` from the dirty set without reloading it.
    pub fn forget_dirty(&self, file_name: &str) -> bool {
        self.lock_scanner().clear(&normalize_key(file_name))
    }

    /// Reload `file_name` only if it is dirty. Returns whether a reload happened.
    pub fn refresh_if_dirty(&self, file_name: &str) -> Result<bool, ReloadError> {
        if !self.is_dirty(file_name) {
            return Ok(false);
        }
        self.reload_file(file_name)?;
        Ok(true)
    }

    /// Run [`ConfigManager::rescan`] every `interval` until `shutdown` flips to
    /// true or its sender is dropped.
    pub fn spawn_rescan(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let m = Arc::clone(&manager);
                        match tokio::task::spawn_blocking(move || m.rescan()).await {
                            Ok(Ok(_)) => {}
                            Ok(Err(e)) => warn!("Rescan failed: {}", e),
                            Err(e) => error!("Rescan task failed: {}", e),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Rescan loop received shutdown signal, exiting");
                            break;
                        }
                    }
                }
            }
        })
    }

    fn lock_scanner(&self) -> std::sync::MutexGuard<'_, ModTimeScanner> {
        self.scanner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Registered names use forward slashes so they match scanner keys.
fn normalize_key(file_name: &str) -> String {
    file_name.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::error::LoadError;
    use serde::Deserialize;
    use std::fs;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::SystemTime;
    use tempfile::TempDir;

    #[derive(Debug, Default, Deserialize)]
    struct Rates {
        value: i64,
    }

    impl TableData for Rates {
        fn after_load(&mut self) -> anyhow::Result<()> {
            anyhow::ensure!(self.value != 13, "unlucky value");
            Ok(())
        }
    }

    fn write_at(path: &Path, body: &str, secs: u64) {
        fs::write(path, body).unwrap();
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn setup() -> (TempDir, ConfigManager, Arc<TableCell<Rates>>) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("pkg")).unwrap();
        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 1}"#, 1_000);

        let manager = ConfigManager::new(temp.path());
        let cell = Arc::new(TableCell::<Rates>::new("pkg/Rates.json"));
        manager.register_reloadable(cell.clone());
        assert_eq!(manager.load_all(), 1);
        manager.start().unwrap();
        (temp, manager, cell)
    }

    #[test]
    fn test_mtime_change_marks_dirty_and_reload_clears() {
        let (temp, manager, cell) = setup();
        assert!(!manager.is_dirty("pkg/Rates.json"));

        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 2}"#, 2_000);
        assert_eq!(manager.rescan().unwrap(), vec!["pkg/Rates.json"]);
        assert!(manager.is_dirty("pkg/Rates.json"));
        assert_eq!(cell.get().value, 1);

        manager.reload_file("pkg/Rates.json").unwrap();
        assert!(!manager.is_dirty("pkg/Rates.json"));
        assert_eq!(cell.get().value, 2);
    }

    #[test]
    fn test_failed_reload_keeps_active_and_dirty() {
        let (temp, manager, cell) = setup();
        write_at(&temp.path().join("pkg/Rates.json"), "{ broken", 2_000);
        manager.rescan().unwrap();

        let err = manager.reload_file("pkg/Rates.json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedJson);
        assert_eq!(cell.get().value, 1);
        assert!(manager.is_dirty("pkg/Rates.json"));
        assert!(!cell.has_staging());
    }

    #[test]
    fn test_failed_hook_blocks_publish() {
        let (temp, manager, cell) = setup();
        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 13}"#, 2_000);
        manager.rescan().unwrap();

        let err = manager.reload_file("pkg/Rates.json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::AfterLoadFailed);
        assert_eq!(cell.get().value, 1);
        assert!(manager.is_dirty("pkg/Rates.json"));
    }

    /// Reloadable table that can be held inside its next staging load.
    struct Paused {
        cell: TableCell<Rates>,
        armed: AtomicBool,
        gate: Barrier,
    }

    impl ConfigObject for Paused {
        fn file_name(&self) -> &str {
            self.cell.file_name()
        }

        fn load_active(&self, raw: &[u8]) -> Result<(), LoadError> {
            self.cell.load_active(raw)
        }
    }

    impl ReloadableObject for Paused {
        fn load_staging(&self, raw: &[u8]) -> Result<(), LoadError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                // Once to say the file was read, once to be released.
                self.gate.wait();
                self.gate.wait();
            }
            self.cell.load_staging(raw)
        }

        fn on_reload_finished(&self) {
            self.cell.on_reload_finished()
        }
    }

    #[test]
    fn test_write_during_reload_stays_dirty() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("Rates.json");
        write_at(&file, r#"{"value": 1}"#, 1_000);

        let manager = Arc::new(ConfigManager::new(temp.path()));
        let paused = Arc::new(Paused {
            cell: TableCell::new("Rates.json"),
            armed: AtomicBool::new(true),
            gate: Barrier::new(2),
        });
        manager.register_reloadable(paused.clone());
        manager.start().unwrap();

        write_at(&file, r#"{"value": 2}"#, 2_000);
        manager.rescan().unwrap();
        let reload = {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || manager.reload_file("Rates.json"))
        };

        paused.gate.wait();
        write_at(&file, r#"{"value": 3}"#, 3_000);
        manager.rescan().unwrap();
        paused.gate.wait();
        reload.join().unwrap().unwrap();

        assert_eq!(paused.cell.get().value, 2);
        assert!(manager.is_dirty("Rates.json"));

        assert!(manager.refresh_if_dirty("Rates.json").unwrap());
        assert_eq!(paused.cell.get().value, 3);
        assert!(!manager.is_dirty("Rates.json"));
    }

    #[test]
    fn test_unscanned_write_is_caught_by_next_scan() {
        let (temp, manager, cell) = setup();
        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 4}"#, 2_000);
        manager.rescan().unwrap();
        manager.reload_file("pkg/Rates.json").unwrap();
        assert!(!manager.is_dirty("pkg/Rates.json"));

        // A write the scanner has not seen yet is picked up by the next scan.
        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 5}"#, 3_000);
        assert_eq!(manager.rescan().unwrap(), vec!["pkg/Rates.json"]);
        manager.reload_file("pkg/Rates.json").unwrap();
        assert_eq!(cell.get().value, 5);
    }

    #[test]
    fn test_forget_dirty() {
        let (temp, manager, _cell) = setup();
        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 6}"#, 2_000);
        manager.rescan().unwrap();
        assert!(manager.forget_dirty("pkg/Rates.json"));
        assert!(!manager.is_dirty("pkg/Rates.json"));
        assert!(!manager.forget_dirty("pkg/Rates.json"));
    }

    #[test]
    fn test_refresh_if_dirty() {
        let (temp, manager, cell) = setup();
        assert!(!manager.refresh_if_dirty("pkg/Rates.json").unwrap());

        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 7}"#, 3_000);
        manager.rescan().unwrap();
        assert!(manager.refresh_if_dirty("pkg/Rates.json").unwrap());
        assert_eq!(cell.get().value, 7);
        assert!(manager.dirty_files().is_empty());
    }

    #[test]
    fn test_capability_errors() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("Fixed.json"), r#"{"value": 5}"#).unwrap();
        let manager = ConfigManager::new(temp.path());
        let fixed = Arc::new(TableCell::<Rates>::new("Fixed.json"));
        manager.register_static(fixed.clone());
        manager.load_file(fixed.as_ref()).unwrap();
        assert_eq!(fixed.get().value, 5);

        let err = manager.reload_file("Fixed.json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotReloadable);
        let err = manager.reload_file("Other.json").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotRegistered);
        assert!(!manager.capability("Fixed.json").unwrap().is_reloadable());
    }

    #[test]
    fn test_load_missing_file_reports_not_found() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp.path());
        let cell = TableCell::<Rates>::new("absent.json");
        let err = manager.load_file(&cell).unwrap_err();
        assert_eq!(err.code(), ErrorCode::FileNotFound);
        assert_eq!(cell.get().value, 0);
    }

    #[tokio::test]
    async fn test_spawn_rescan_stops_on_signal() {
        let (temp, manager, _cell) = setup();
        let manager = Arc::new(manager);
        let (tx, rx) = watch::channel(false);
        let task = manager.spawn_rescan(Duration::from_millis(10), rx);

        write_at(&temp.path().join("pkg/Rates.json"), r#"{"value": 3}"#, 4_000);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !manager.is_dirty("pkg/Rates.json") {
            assert!(tokio::time::Instant::now() < deadline, "rescan never ran");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
