//! Tool settings.
//!
//! Settings are merged field by field from these tiers, lowest first:
//! 1. **Defaults** - compiled in
//! 2. **User** - `<config dir>/tablecfg/conf.yaml`
//! 3. **Project** - `./conf.yaml`
//! 4. **Explicit** - `--config <path>`
//! 5. **Environment**
//!
//! ## Environment Variables
//! - `TABLECFG_METADATA_PATH` - Schema root
//! - `TABLECFG_DATA_PATH` - Data root
//! - `TABLECFG_SCAN_INTERVAL` - Watcher interval in seconds

mod loader;
mod merge;
mod types;

pub use loader::{
    ConfigLoader, ConfigPaths, ConfigTier, ENV_DATA_PATH, ENV_METADATA_PATH, ENV_SCAN_INTERVAL,
    SETTINGS_FILE,
};
pub use merge::{deep_merge, deep_merge_all};
pub use types::Settings;
