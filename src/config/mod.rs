//! Configuration module for vaso-trace
//!
//! This module handles engine configuration:
//! - LOD pyramid shape and window cache size
//! - Point editor defaults and warning thresholds
//!
//! # Config Location
//!
//! The user configuration is a TOML file stored in the platform-appropriate
//! data directory:
//! - **Linux**: `~/.local/share/org.vasoanalyzer.vaso-trace/config.toml`
//! - **macOS**: `~/Library/Application Support/org.vasoanalyzer.vaso-trace/config.toml`
//! - **Windows**: `%APPDATA%\org.vasoanalyzer.vaso-trace\config.toml`
//!
//! Missing keys fall back to their defaults, so a partial file is valid:
//!
//! ```toml
//! [lod]
//! base_factor = 8
//!
//! [editor]
//! connect_method = "cubic"
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "org.vasoanalyzer.vaso-trace";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        TraceError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            TraceError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the user config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== Engine Config ====================

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Level-of-detail settings
    pub lod: LodSettings,

    /// Point editor settings
    pub editor: EditorSettings,
}

impl EngineConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TraceError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Render the config as TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TraceError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TraceError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Save to a config file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| {
            TraceError::Config(format!("Failed to write config {:?}: {}", path, e))
        })?;
        tracing::debug!("Saved engine config to {:?}", path);
        Ok(())
    }

    /// Save to the default location
    pub fn save_default(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save(dir.join(CONFIG_FILE))
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                tracing::info!("Loaded engine config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Failed to load engine config, using defaults: {}", e);
                Self::default()
            }
        }
    }
}
