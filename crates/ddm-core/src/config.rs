//! Global tunables loaded from `~/.config/ddm/config.toml`.
//!
//! These are single-invocation tuning knobs, not persisted job state: the
//! downloader has no notion of a resumable session across process runs
//! beyond the per-segment temp files it leaves on disk (see `storage`).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default segment thread count when the caller doesn't request one explicitly.
pub const DEFAULT_THREADS: usize = 4;
/// Hard cap on segment count (spec.md §4.G).
pub const MAX_THREADS: usize = 16;
/// Minimum bytes per segment; below this the scheduler reduces thread count.
pub const MIN_SEGMENT_SIZE: u64 = 1024 * 1024;
/// Maximum redirects followed by the single-stream fallback path.
pub const MAX_REDIRECTS: u32 = 10;
/// Maximum retry attempts per segment (spec.md §4.H).
pub const MAX_SEGMENT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdmConfig {
    /// Default number of segments/threads for multi-segment downloads.
    pub default_threads: usize,
    /// Connect and read/write timeout, in seconds (spec.md §4.B: 30s each).
    pub timeout_secs: u64,
    /// Delay between segment retry attempts, in seconds (spec.md §4.H: 3s).
    pub retry_delay_secs: u64,
    /// Maximum attempts per segment before giving up (spec.md §4.H: 5).
    pub max_segment_attempts: u32,
}

impl Default for DdmConfig {
    fn default() -> Self {
        Self {
            default_threads: DEFAULT_THREADS,
            timeout_secs: 30,
            retry_delay_secs: 3,
            max_segment_attempts: MAX_SEGMENT_ATTEMPTS,
        }
    }
}

impl DdmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ddm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
/// On any I/O or parse failure, falls back to `DdmConfig::default()` so a
/// broken/unwritable config never blocks a download.
pub fn load_or_init() -> DdmConfig {
    match try_load_or_init() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("using default config: {}", e);
            DdmConfig::default()
        }
    }
}

fn try_load_or_init() -> Result<DdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
