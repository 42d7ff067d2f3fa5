//! Store configuration.
//!
//! ```toml
//! sync_interval_ms = 2000
//! storage_dir = "files"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::StoreError;

const DEFAULT_SYNC_INTERVAL_MS: u64 = 2_000;

fn default_sync_interval_ms() -> u64 {
    DEFAULT_SYNC_INTERVAL_MS
}

/// Settings for a [`ModelStore`](crate::ModelStore).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Delay between two sync cycles of the background loop.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,
    /// Directory for file persistence. `None` disables it.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            sync_interval_ms: DEFAULT_SYNC_INTERVAL_MS,
            storage_dir: None,
        }
    }
}

impl StoreConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, StoreError> {
        let config: StoreConfig =
            toml::from_str(source).map_err(|e| StoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| StoreError::storage(path, e))?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.sync_interval_ms == 0 {
            return Err(StoreError::Config(
                "sync_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
