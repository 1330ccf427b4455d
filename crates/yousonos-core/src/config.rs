//! Client configuration.
//!
//! Every field has a default, so a partial or missing file is valid.
//! Out-of-range values are clamped by [`ClientConfig::validate`] rather than
//! rejected.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::search::DEFAULT_PAGE_SIZE;
use crate::volume::DEFAULT_VOLUME_STEP;

/// Largest accepted search page size.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Default skip of the seek buttons, in milliseconds.
pub const DEFAULT_SEEK_STEP_MS: u64 = 10_000;

/// Quiescence intervals of the debounced commands, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Interval before `set_volume` is sent.
    #[serde(default = "default_volume_ms")]
    pub volume_ms: u64,
    /// Interval before a typed query is searched.
    #[serde(default = "default_search_ms")]
    pub search_ms: u64,
    /// Interval before `seek_to` is sent.
    #[serde(default = "default_seek_ms")]
    pub seek_ms: u64,
}

const fn default_volume_ms() -> u64 {
    300
}

const fn default_search_ms() -> u64 {
    500
}

const fn default_seek_ms() -> u64 {
    750
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            volume_ms: default_volume_ms(),
            search_ms: default_search_ms(),
            seek_ms: default_seek_ms(),
        }
    }
}

impl DebounceConfig {
    /// Volume interval.
    #[must_use]
    pub const fn volume(&self) -> Duration {
        Duration::from_millis(self.volume_ms)
    }

    /// Search interval.
    #[must_use]
    pub const fn search(&self) -> Duration {
        Duration::from_millis(self.search_ms)
    }

    /// Seek interval.
    #[must_use]
    pub const fn seek(&self) -> Duration {
        Duration::from_millis(self.seek_ms)
    }
}

/// Remote control configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Debounce intervals.
    #[serde(default)]
    pub debounce: DebounceConfig,
    /// New result indices requested per search page.
    #[serde(default = "default_page_size")]
    pub search_page_size: u32,
    /// Increment of the volume step buttons.
    #[serde(default = "default_volume_step")]
    pub volume_step: u32,
    /// Skip of the seek buttons, in milliseconds.
    #[serde(default = "default_seek_step_ms")]
    pub seek_step_ms: u64,
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_volume_step() -> u32 {
    DEFAULT_VOLUME_STEP
}

const fn default_seek_step_ms() -> u64 {
    DEFAULT_SEEK_STEP_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            debounce: DebounceConfig::default(),
            search_page_size: default_page_size(),
            volume_step: default_volume_step(),
            seek_step_ms: default_seek_step_ms(),
        }
    }
}

impl ClientConfig {
    /// Load the configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path())
    }

    /// Load the configuration from `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| Error::FileSystem {
            path: path.to_path_buf(),
            message: format!("Failed to read config file: {e}"),
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {e}")))?;

        info!("Loaded config from {}", path.display());
        Ok(config.validate())
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| Error::FileSystem {
                path: parent.to_path_buf(),
                message: format!("Failed to create config directory: {e}"),
            })?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::FileSystem {
            path: path.to_path_buf(),
            message: format!("Failed to write config file: {e}"),
        })?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Clamp every value into its accepted range.
    #[must_use]
    pub fn validate(mut self) -> Self {
        let debounce = &mut self.debounce;
        for (name, value) in [
            ("volume", &mut debounce.volume_ms),
            ("search", &mut debounce.search_ms),
            ("seek", &mut debounce.seek_ms),
        ] {
            if *value == 0 {
                warn!("Debounce interval for {} must be at least 1 ms", name);
                *value = 1;
            }
        }

        let page_size = self.search_page_size.clamp(1, MAX_PAGE_SIZE);
        if page_size != self.search_page_size {
            warn!(
                "Search page size {} out of range, using {}",
                self.search_page_size, page_size
            );
            self.search_page_size = page_size;
        }
        if self.volume_step == 0 {
            warn!("Volume step must be at least 1");
            self.volume_step = 1;
        }
        if self.seek_step_ms == 0 {
            warn!("Seek step must be at least 1 ms");
            self.seek_step_ms = 1;
        }
        self
    }
}

/// Default location of the configuration file.
#[must_use]
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yousonos")
        .join("config.json")
}
