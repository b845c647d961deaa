// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration.
//!
//! Stored as JSON next to the editor, or wherever `KITE_CONFIG` points.
//! A missing file means defaults.

use kite_scene::{ProjectHeader, MAX_HISTORY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "kite_config.json";

/// Environment variable overriding the config path
pub const CONFIG_ENV_VAR: &str = "KITE_CONFIG";

/// Maximum number of recent projects remembered
pub const MAX_RECENT_PROJECTS: usize = 10;

/// Config errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid config JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Graphics settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// VSync enabled
    pub vsync: bool,
    /// Frame rate cap (0 = unlimited)
    pub max_framerate: u32,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            vsync: true,
            max_framerate: 60,
        }
    }
}

/// Editor-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Graphics settings
    pub graphics: GraphicsConfig,
    /// Recently opened projects, most recent first
    pub projects: Vec<ProjectHeader>,
    /// Undo history length for opened documents
    pub max_history_length: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            graphics: GraphicsConfig::default(),
            projects: Vec::new(),
            max_history_length: MAX_HISTORY,
        }
    }
}

impl EditorConfig {
    /// Config path from the environment, or the default file name
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Load the config; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };

        let mut config: EditorConfig = serde_json::from_str(&content)?;
        if config.max_history_length == 0 {
            tracing::warn!("max_history_length of 0 in config, using {}", MAX_HISTORY);
            config.max_history_length = MAX_HISTORY;
        }
        Ok(config)
    }

    /// Save the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Move a project to the front of the recent list
    pub fn record_recent(&mut self, header: &ProjectHeader) {
        self.projects.retain(|project| project.path != header.path);
        self.projects.insert(0, header.clone());
        self.projects.truncate(MAX_RECENT_PROJECTS);
    }
}
