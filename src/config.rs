//! Service configuration module.
//!
//! Handles loading and validating `thumb-mill.toml`. Configuration is a
//! plain value handed to the scanner and planner at construction — there
//! is no process-global state, so tests can run isolated instances with
//! different roots in parallel.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! pictures_root = "pictures"   # Source image library root
//! thumbnail_root = "thumbs"    # Where generated renditions go
//! device_layout = false        # NAS @eaDir sibling layout instead of mirroring
//! generation_enabled = true    # Master switch for the background scanner
//! batch_size = 100             # Pending records fetched per scan cycle
//! scan_interval_secs = 60      # Idle sleep between empty scans
//! debug_single_thread = false  # Cap generation at one worker (deterministic stepping)
//! ```
//!
//! Config files are sparse — override just the values you want. Unknown
//! keys are rejected to catch typos early.

use crate::paths::Layout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `thumb-mill.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Root of the source image library.
    pub pictures_root: PathBuf,
    /// Root of the generated thumbnail tree (mirrored layout only).
    pub thumbnail_root: PathBuf,
    /// Place renditions in `@eaDir` sibling directories instead of
    /// mirroring the hierarchy under `thumbnail_root`.
    pub device_layout: bool,
    /// Master switch: when false the service starts but generates nothing.
    pub generation_enabled: bool,
    /// How many pending records one scan cycle fetches.
    pub batch_size: usize,
    /// Idle sleep between scans that found nothing, in seconds.
    pub scan_interval_secs: u64,
    /// Run generation on a single worker. Keeps single-stepping under a
    /// debugger deterministic.
    pub debug_single_thread: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pictures_root: PathBuf::from("pictures"),
            thumbnail_root: PathBuf::from("thumbs"),
            device_layout: false,
            generation_enabled: true,
            batch_size: 100,
            scan_interval_secs: 60,
            debug_single_thread: false,
        }
    }
}

impl ServiceConfig {
    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Validation("batch_size must be non-zero".into()));
        }
        if self.pictures_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation("pictures_root must be set".into()));
        }
        if !self.device_layout && self.thumbnail_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "thumbnail_root must be set unless device_layout is enabled".into(),
            ));
        }
        Ok(())
    }

    /// The filesystem layout renditions are placed in.
    pub fn layout(&self) -> Layout {
        if self.device_layout {
            Layout::Device
        } else {
            Layout::Standard
        }
    }

    /// Idle sleep between empty scans.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Generation worker bound: half the machine's cores with a floor of
    /// two. Each worker may hold a full-size decode in memory, so
    /// thread-per-item would risk memory pressure. One worker in
    /// single-thread debug mode.
    pub fn worker_count(&self) -> usize {
        if self.debug_single_thread {
            return 1;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cores / 2).max(2)
    }
}

/// A documented stock config, printed by `thumb-mill gen-config`.
pub fn stock_config_toml() -> String {
    let defaults = ServiceConfig::default();
    format!(
        r#"# thumb-mill configuration
# All options are optional - the values below are the defaults.

# Source image library root.
pictures_root = "{pictures}"

# Where generated renditions go (mirrors the library hierarchy).
thumbnail_root = "{thumbs}"

# Place renditions in @eaDir sibling directories (NAS photo-station
# convention) instead of mirroring under thumbnail_root.
device_layout = false

# Master switch for the background scanner.
generation_enabled = true

# Pending records fetched per scan cycle.
batch_size = {batch}

# Idle sleep between scans that found no work, in seconds.
scan_interval_secs = {interval}

# Cap generation at a single worker (deterministic debugging).
debug_single_thread = false
"#,
        pictures = defaults.pictures_root.display(),
        thumbs = defaults.thumbnail_root.display(),
        batch = defaults.batch_size,
        interval = defaults.scan_interval_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ServiceConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.scan_interval(), Duration::from_secs(60));
        assert!(config.generation_enabled);
        assert!(!config.device_layout);
        assert_eq!(config.layout(), Layout::Standard);
        config.validate().unwrap();
    }

    #[test]
    fn sparse_overrides_keep_other_defaults() {
        let config: ServiceConfig =
            toml::from_str("batch_size = 25\ndevice_layout = true").unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.layout(), Layout::Device);
        assert_eq!(config.scan_interval_secs, 60);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<ServiceConfig, _> = toml::from_str("batchsize = 25");
        assert!(result.is_err());
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let config = ServiceConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn empty_thumbnail_root_only_valid_in_device_layout() {
        let mut config = ServiceConfig {
            thumbnail_root: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.device_layout = true;
        config.validate().unwrap();
    }

    #[test]
    fn worker_count_floor_and_debug_cap() {
        let config = ServiceConfig::default();
        assert!(config.worker_count() >= 2);

        let debug = ServiceConfig {
            debug_single_thread: true,
            ..Default::default()
        };
        assert_eq!(debug.worker_count(), 1);
    }

    #[test]
    fn stock_config_parses_back_to_defaults() {
        let parsed: ServiceConfig = toml::from_str(&stock_config_toml()).unwrap();
        assert_eq!(parsed.batch_size, ServiceConfig::default().batch_size);
        parsed.validate().unwrap();
    }

    #[test]
    fn load_reports_missing_file() {
        let result = ServiceConfig::load(Path::new("/no/such/thumb-mill.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
