//! Tool settings.

use crate::error::SettingsError;
use crate::watcher::WatcherConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_metadata_path() -> PathBuf {
    PathBuf::from("metadata")
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data")
}

fn default_scan_interval_secs() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    500
}

/// Where schemas and data live, and how the watcher polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Root of the schema documents, one per package.
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,

    /// Root of the data files, `<package>/<table>.json`.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Use filesystem notifications in addition to polling.
    #[serde(default)]
    pub fs_events: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            metadata_path: default_metadata_path(),
            data_path: default_data_path(),
            scan_interval_secs: default_scan_interval_secs(),
            debounce_ms: default_debounce_ms(),
            fs_events: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.scan_interval_secs == 0 {
            return Err(SettingsError::InvalidValue {
                key: "scan_interval_secs".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.metadata_path.as_os_str().is_empty() {
            return Err(SettingsError::InvalidValue {
                key: "metadata_path".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.data_path.as_os_str().is_empty() {
            return Err(SettingsError::InvalidValue {
                key: "data_path".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            interval: self.scan_interval(),
            debounce: Duration::from_millis(self.debounce_ms),
            fs_events: self.fs_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_fills_defaults() {
        let settings: Settings = serde_yaml::from_str("data_path: /srv/data\n").unwrap();
        assert_eq!(settings.data_path, PathBuf::from("/srv/data"));
        assert_eq!(settings.metadata_path, PathBuf::from("metadata"));
        assert_eq!(settings.scan_interval_secs, 30);
        assert!(!settings.fs_events);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let settings = Settings {
            scan_interval_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_watcher_config() {
        let settings = Settings {
            scan_interval_secs: 7,
            debounce_ms: 250,
            fs_events: true,
            ..Settings::default()
        };
        let config = settings.watcher_config();
        assert_eq!(config.interval, Duration::from_secs(7));
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert!(config.fs_events);
    }
}
