//! Bridge configuration: built-in defaults, an optional file, then
//! environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use element_locator::{BindingStrategy, LocateOptions, MatchMode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_LOG_LEVEL: &str = "AXBRIDGE_LOG_LEVEL";
pub const ENV_USE_FIRST_MATCH: &str = "AXBRIDGE_USE_FIRST_MATCH";
pub const ENV_BOUND_ELEMENTS_BY_INDEX: &str = "AXBRIDGE_BOUND_ELEMENTS_BY_INDEX";
pub const ENV_FIXTURE: &str = "AXBRIDGE_FIXTURE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Deserialize(String),
    #[error("invalid value '{value}' for {variable}")]
    InvalidOverride { variable: &'static str, value: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub log_level: String,
    /// Default match mode when a request does not pick one.
    pub use_first_match: bool,
    /// Default binding strategy for issued keys.
    pub bound_elements_by_index: bool,
    /// Whether source dumps carry the positional attribute.
    pub include_index_paths: bool,
    /// Recorded hierarchy to serve instead of a native host.
    pub fixture: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            use_first_match: false,
            bound_elements_by_index: false,
            include_index_paths: false,
            fixture: None,
        }
    }
}

impl BridgeConfig {
    /// Per-call defaults derived from the configuration.
    pub fn locate_options(&self) -> LocateOptions {
        LocateOptions {
            mode: if self.use_first_match {
                MatchMode::First
            } else {
                MatchMode::All
            },
            binding: if self.bound_elements_by_index {
                BindingStrategy::Index
            } else {
                BindingStrategy::Reference
            },
        }
    }

    /// Applies overrides looked up through `var`.
    pub fn apply_overrides<F>(&mut self, var: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = var(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(raw) = var(ENV_USE_FIRST_MATCH) {
            self.use_first_match = parse_flag(ENV_USE_FIRST_MATCH, &raw)?;
        }
        if let Some(raw) = var(ENV_BOUND_ELEMENTS_BY_INDEX) {
            self.bound_elements_by_index = parse_flag(ENV_BOUND_ELEMENTS_BY_INDEX, &raw)?;
        }
        if let Some(path) = var(ENV_FIXTURE).filter(|path| !path.is_empty()) {
            self.fixture = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

fn parse_flag(variable: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidOverride {
            variable,
            value: raw.to_string(),
        }),
    }
}

pub fn parse_config_str(raw: &str) -> Result<BridgeConfig, ConfigError> {
    match serde_json::from_str(raw) {
        Ok(config) => Ok(config),
        Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
            ConfigError::Deserialize(format!(
                "json error: {}; yaml error: {}",
                json_err, yaml_err
            ))
        }),
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("axbridge").join("config.yaml"))
}

pub struct LoadedConfig {
    pub config: BridgeConfig,
    /// File the configuration was read from, if one existed.
    pub source: Option<PathBuf>,
}

/// Loads `explicit`, or the per-user default path, then applies the
/// process environment. A missing file leaves the defaults in place.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let candidate = explicit.map(Path::to_path_buf).or_else(default_config_path);
    let mut loaded = match candidate {
        Some(path) if path.exists() => {
            let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            LoadedConfig {
                config: parse_config_str(&raw)?,
                source: Some(path),
            }
        }
        _ => LoadedConfig {
            config: BridgeConfig::default(),
            source: None,
        },
    };
    loaded
        .config
        .apply_overrides(|name| std::env::var(name).ok())?;
    Ok(loaded)
}
