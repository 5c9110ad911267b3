//! Settings loader with tier-based merging.

use super::merge::deep_merge_all;
use super::types::Settings;
use crate::error::SettingsError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the settings document in each tier directory.
pub const SETTINGS_FILE: &str = "conf.yaml";

pub const ENV_METADATA_PATH: &str = "TABLECFG_METADATA_PATH";
pub const ENV_DATA_PATH: &str = "TABLECFG_DATA_PATH";
pub const ENV_SCAN_INTERVAL: &str = "TABLECFG_SCAN_INTERVAL";

/// Settings tier priority (lowest to highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigTier {
    Defaults = 0,
    /// `<config dir>/tablecfg/conf.yaml`
    User = 1,
    /// `./conf.yaml`
    Project = 2,
    /// `--config <path>`
    Explicit = 3,
    Environment = 4,
}

impl std::fmt::Display for ConfigTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigTier::Defaults => write!(f, "defaults"),
            ConfigTier::User => write!(f, "user"),
            ConfigTier::Project => write!(f, "project"),
            ConfigTier::Explicit => write!(f, "explicit"),
            ConfigTier::Environment => write!(f, "environment"),
        }
    }
}

/// Settings files for each tier.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub user_file: Option<PathBuf>,
    pub project_file: Option<PathBuf>,
    /// Must exist when given.
    pub explicit_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Standard locations plus an optional explicit file.
    pub fn discover(explicit_file: Option<PathBuf>) -> Self {
        Self {
            user_file: dirs::config_dir().map(|d| d.join("tablecfg").join(SETTINGS_FILE)),
            project_file: Some(PathBuf::from(SETTINGS_FILE)),
            explicit_file,
        }
    }
}

/// Loads [`Settings`] from every tier.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    settings: Settings,
    /// Tiers that contributed, in merge order.
    sources: Vec<(ConfigTier, Option<PathBuf>)>,
}

impl ConfigLoader {
    /// Load from the standard locations and the process environment.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self, SettingsError> {
        Self::load_with(ConfigPaths::discover(explicit_file), |key| {
            std::env::var(key).ok()
        })
    }

    /// Load from `paths`, reading environment overrides through `env`.
    pub fn load_with(
        paths: ConfigPaths,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let mut tiers = Vec::new();
        let mut sources = vec![(ConfigTier::Defaults, None)];

        let defaults = serde_json::to_value(Settings::default()).map_err(|e| {
            SettingsError::InvalidValue {
                key: "defaults".into(),
                reason: e.to_string(),
            }
        })?;
        tiers.push(defaults);

        for (tier, file) in [
            (ConfigTier::User, &paths.user_file),
            (ConfigTier::Project, &paths.project_file),
        ] {
            if let Some(path) = file
                && path.is_file()
            {
                tiers.push(read_tier(path)?);
                sources.push((tier, Some(path.clone())));
            }
        }

        if let Some(path) = &paths.explicit_file {
            tiers.push(read_tier(path)?);
            sources.push((ConfigTier::Explicit, Some(path.clone())));
        }

        let merged = deep_merge_all(tiers);
        let mut settings: Settings =
            serde_json::from_value(merged).map_err(|e| SettingsError::InvalidValue {
                key: "settings".into(),
                reason: e.to_string(),
            })?;

        if apply_env_overrides(&mut settings, env)? {
            sources.push((ConfigTier::Environment, None));
        }
        settings.validate()?;

        for (tier, path) in &sources {
            match path {
                Some(path) => debug!(tier = %tier, path = %path.display(), "Settings tier applied"),
                None => debug!(tier = %tier, "Settings tier applied"),
            }
        }

        Ok(Self {
            paths,
            settings,
            sources,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn into_settings(self) -> Settings {
        self.settings
    }

    pub fn sources(&self) -> &[(ConfigTier, Option<PathBuf>)] {
        &self.sources
    }
}

fn read_tier(path: &Path) -> Result<Value, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns true if any variable was set.
fn apply_env_overrides(
    settings: &mut Settings,
    env: impl Fn(&str) -> Option<String>,
) -> Result<bool, SettingsError> {
    let mut applied = false;
    if let Some(path) = env(ENV_METADATA_PATH) {
        settings.metadata_path = PathBuf::from(path);
        applied = true;
    }
    if let Some(path) = env(ENV_DATA_PATH) {
        settings.data_path = PathBuf::from(path);
        applied = true;
    }
    if let Some(raw) = env(ENV_SCAN_INTERVAL) {
        settings.scan_interval_secs =
            raw.trim()
                .parse()
                .map_err(|_| SettingsError::InvalidValue {
                    key: ENV_SCAN_INTERVAL.into(),
                    reason: format!("expected seconds, got {raw:?}"),
                })?;
        applied = true;
    }
    Ok(applied)
}
