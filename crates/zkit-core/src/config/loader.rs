//! Layered loading of configuration files
//!
//! The `ConfigLoader` reads configuration layers from disk and merges them,
//! later layers overriding earlier ones. Built-in defaults are not a file
//! layer; [`ConfigPipeline`](super::ConfigPipeline) applies them.

use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::UserConfig;
use crate::{Error, Result};

/// Project configuration file name
pub const CONFIG_FILENAME: &str = "zkit.toml";

/// Git-ignored local overrides, next to the project file
pub const LOCAL_CONFIG_FILENAME: &str = "zkit.local.toml";

/// Loads and merges configuration layers
///
/// Configuration is loaded from a hierarchy of sources:
/// 1. Global user config (`<config_dir>/zkit/config.toml`)
/// 2. Project config (`zkit.toml`, or the path given with `--config`)
/// 3. Local overrides (`zkit.local.toml` next to the project config)
pub struct ConfigLoader {
    /// Path of the project configuration file
    config_path: PathBuf,

    /// Override for the global config directory (used for testing).
    /// When `None`, the platform-appropriate directory is used via `dirs::config_dir()`.
    global_config_dir_override: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader for the given project configuration file
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            global_config_dir_override: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// This is primarily useful for testing, where you need to control
    /// the global config path without affecting the real user config.
    pub fn with_global_config_dir(
        config_path: impl Into<PathBuf>,
        global_config_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            global_config_dir_override: Some(global_config_dir.into()),
        }
    }

    /// Find the project configuration by walking up from `start`
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILENAME))
            .find(|candidate| candidate.is_file())
    }

    fn global_config_dir(&self) -> Option<PathBuf> {
        if let Some(ref override_dir) = self.global_config_dir_override {
            return Some(override_dir.clone());
        }
        dirs::config_dir().map(|d| d.join("zkit"))
    }

    /// The project configuration file this loader reads
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Directory holding the project configuration; task paths are relative
    /// to it
    pub fn project_root(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Path of the local overrides file
    pub fn local_overrides_path(&self) -> PathBuf {
        self.project_root().join(LOCAL_CONFIG_FILENAME)
    }

    /// Check if local overrides exist
    pub fn has_local_overrides(&self) -> bool {
        self.local_overrides_path().is_file()
    }

    /// Load and merge all layers
    ///
    /// The global and local layers are optional and skipped when missing.
    /// Invalid TOML in any layer produces an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the project file does not exist.
    pub fn load(&self) -> Result<UserConfig> {
        let mut config = UserConfig::default();

        // Layer 1 - Global user config
        if let Some(global_dir) = self.global_config_dir() {
            let global_config_path = global_dir.join("config.toml");
            if global_config_path.is_file() {
                tracing::debug!(?global_config_path, "Loading global config (layer 1)");
                config.merge(&read_layer(&global_config_path)?);
            } else {
                tracing::debug!(
                    ?global_config_path,
                    "No global config found (layer 1), skipping"
                );
            }
        }

        // Layer 2 - Project config
        if !self.config_path.is_file() {
            return Err(Error::ConfigNotFound {
                path: self.config_path.clone(),
            });
        }
        tracing::debug!(config_path = ?self.config_path, "Loading project config (layer 2)");
        config.merge(&read_layer(&self.config_path)?);

        // Layer 3 - Local overrides
        let local_config_path = self.local_overrides_path();
        if local_config_path.is_file() {
            tracing::debug!(?local_config_path, "Loading local overrides (layer 3)");
            config.merge(&read_layer(&local_config_path)?);
        }

        Ok(config)
    }
}

fn read_layer(path: &Path) -> Result<UserConfig> {
    let content = fs::read_to_string(path)?;
    UserConfig::parse(&content)
}
