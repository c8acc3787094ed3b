use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::color::Palette;

/// Engine configuration, usually loaded from `tideline.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub palette: Palette,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            sync: SyncConfig::default(),
            palette: Palette::default(),
        }
    }
}

/// Backend fetch tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Page size for the unfiltered task query. The task backend cannot
    /// filter by deadline server-side, so pages are walked until a short
    /// page arrives.
    #[serde(default = "default_task_page_size")]
    pub task_page_size: usize,
    /// Upper bound on task pages walked per refresh.
    #[serde(default = "default_max_task_pages")]
    pub max_task_pages: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            task_page_size: default_task_page_size(),
            max_task_pages: default_max_task_pages(),
        }
    }
}

/// External provider sync tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Whether an external calendar provider is configured at all. When
    /// false, sync attempts report the not-configured condition without
    /// calling the provider.
    #[serde(default)]
    pub enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl EngineConfig {
    /// Parse a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error when the text is not valid TOML for this schema.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse engine config")
    }

    /// Load a config file, falling back to defaults when it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

const fn default_task_page_size() -> usize {
    200
}

const fn default_max_task_pages() -> u32 {
    50
}
