//! # Framework Configuration
//!
//! Settings the [`Framework`](super::Framework) is built from: the log level,
//! the folder holding the settings store, and the defaults new scenes get.
//! Persisted through [`Config`], so a framework config can live in a `.toml`
//! or `.ron` file next to the application.

use serde::{Deserialize, Serialize};

use crate::foundation::logging::parse_level;
use crate::scene::{IdReusePolicy, SceneConfig};

pub use crate::config::{Config, ConfigError};

/// # Framework Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Log level name, e.g. `"info"`; `RUST_LOG` still overrides it
    pub log_level: String,
    /// Folder of the settings store
    pub config_folder: String,
    /// Defaults for scenes created by the scene manager
    pub scene: SceneConfig,
}

impl FrameworkConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            config_folder: "config".to_string(),
            scene: SceneConfig::default(),
        }
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the settings folder
    #[must_use]
    pub fn with_config_folder(mut self, folder: impl Into<String>) -> Self {
        self.config_folder = folder.into();
        self
    }

    /// Set the scene defaults
    #[must_use]
    pub fn with_scene(mut self, scene: SceneConfig) -> Self {
        self.scene = scene;
        self
    }

    /// Set the id reuse policy of new scenes
    #[must_use]
    pub fn with_id_reuse(mut self, id_reuse: IdReusePolicy) -> Self {
        self.scene.id_reuse = id_reuse;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if parse_level(&self.log_level).is_none() {
            return Err(format!("Unknown log level: {}", self.log_level));
        }
        if self.config_folder.trim().is_empty() {
            return Err("Config folder cannot be empty".to_string());
        }
        Ok(())
    }
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for FrameworkConfig {}
