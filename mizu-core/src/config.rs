use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MizuError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MizuConfig {
    /// Root for the catalog and, unless overridden, the cache and covers.
    pub data_dir: PathBuf,
    /// Extracted page images, one subdirectory per archive id.
    pub cache_dir: Option<PathBuf>,
    /// Extracted cover images, one subdirectory per archive id.
    pub covers_dir: Option<PathBuf>,
    pub catalog_file: String,
    /// How deep `scan` descends below the chosen folder (1 = direct children).
    pub scan_depth: usize,
    pub progress_interval_ms: u64,
    /// Pages kept extracted on each side of the visible page.
    pub eviction_window: usize,
    /// Entries above this uncompressed size are skipped by the prober.
    pub max_entry_bytes: u64,
}

impl Default for MizuConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".mizu"),
            cache_dir: None,
            covers_dir: None,
            catalog_file: "catalog.mizu".to_string(),
            scan_depth: 1,
            progress_interval_ms: 300,
            eviction_window: 5,
            max_entry_bytes: 64 * 1024 * 1024,
        }
    }
}

impl MizuConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| MizuError::Config(format!("{}: {e}", path.display())))
    }

    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("manga_images"))
    }

    pub fn covers_root(&self) -> PathBuf {
        self.covers_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("covers"))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
