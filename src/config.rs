//! Store configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const DEFAULT_PATH: &str = "acad_guide";
const DEFAULT_MAP_SIZE_MB: usize = 64;
const DEFAULT_RECENT_UPDATES: usize = 5;

/// Settings for opening an [`AcadStore`](crate::acad_store::AcadStore).
///
/// Every field has a default, so `{}` is a valid JSON configuration:
///
/// ```rust
/// use acad_guide_core::config::StoreConfig;
///
/// let config = StoreConfig::from_json(r#"{"path": "campus", "map_size_mb": 16}"#)?;
/// assert_eq!(config.lmdb_dir().to_string_lossy(), "campus.lmdb");
/// assert!(config.fallback_to_memory);
/// # Ok::<(), acad_guide_core::error::StoreError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base path. The LMDB environment lives in `<path>.lmdb/`.
    pub path: String,
    pub map_size_mb: usize,
    /// Continue on an in-memory backend when LMDB cannot be opened.
    pub fallback_to_memory: bool,
    /// Number of entries returned by the recent-updates feed.
    pub recent_updates_limit: usize,
    /// Skip LMDB entirely.
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: DEFAULT_PATH.to_string(),
            map_size_mb: DEFAULT_MAP_SIZE_MB,
            fallback_to_memory: true,
            recent_updates_limit: DEFAULT_RECENT_UPDATES,
            in_memory: false,
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<String>) -> Self {
        StoreConfig {
            path: path.into(),
            ..StoreConfig::default()
        }
    }

    pub fn memory() -> Self {
        StoreConfig {
            in_memory: true,
            ..StoreConfig::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_map_size_mb(mut self, mb: usize) -> Self {
        self.map_size_mb = mb;
        self
    }

    pub fn with_fallback(mut self, enabled: bool) -> Self {
        self.fallback_to_memory = enabled;
        self
    }

    pub fn with_recent_updates_limit(mut self, limit: usize) -> Self {
        self.recent_updates_limit = limit;
        self
    }

    pub fn lmdb_dir(&self) -> PathBuf {
        PathBuf::from(format!("{}.lmdb", self.path))
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.in_memory && self.path.trim().is_empty() {
            return Err(StoreError::validation("Store path cannot be empty"));
        }
        if self.map_size_mb == 0 {
            return Err(StoreError::validation("map_size_mb must be at least 1"));
        }
        Ok(())
    }
}
