use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::{Deadlines, RendererConfig, ValidatorConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Unsupported config format for {0} (expected .json, .yaml or .yml)")]
    UnsupportedFormat(PathBuf),
}

/// Serializable curator configuration.
///
/// Every field has a default, so a partial file (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuratorConfig {
    pub renderer: RendererConfig,
    pub validator: ValidatorConfig,
    pub deadlines: Deadlines,
    /// Concurrent evaluations.
    pub jobs: usize,
    /// Optional outcome ledger (SQLite file).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<PathBuf>,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            validator: ValidatorConfig::default(),
            deadlines: Deadlines::default(),
            jobs: 1,
            ledger: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

fn format_for(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => Ok(Format::Json),
        Some("yaml") | Some("yml") => Ok(Format::Yaml),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Load a config file; the format follows the file extension.
pub fn load_config(path: &Path) -> Result<CuratorConfig, ConfigError> {
    let format = format_for(path)?;
    let text = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    let config = match format {
        Format::Json => serde_json::from_str(&text)?,
        Format::Yaml => serde_yaml::from_str(&text)?,
    };
    Ok(config)
}

/// Write `config` to `path` in the format its extension names.
pub fn save_config(path: &Path, config: &CuratorConfig) -> Result<(), ConfigError> {
    let text = match format_for(path)? {
        Format::Json => serde_json::to_string_pretty(config)?,
        Format::Yaml => serde_yaml::to_string(config)?,
    };
    std::fs::write(path, text).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
}
