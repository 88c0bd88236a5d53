//! Engine configuration, persisted as TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::ranking::LevelMode;

/// Cadences, cache lifetime and ranking mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ticks between urgent cycles.
    #[serde(default = "default_urgent_interval")]
    pub urgent_interval_ticks: u64,
    /// Ticks between normal cycles.
    #[serde(default = "default_normal_interval")]
    pub normal_interval_ticks: u64,
    /// Lifetime of a [`SignalCache`](crate::signal::cache::SignalCache) entry.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_ticks: u64,
    #[serde(default)]
    pub level_mode: LevelMode,
    /// Base score of a rule before any range matches.
    #[serde(default)]
    pub neutral_score: f64,
}

fn default_urgent_interval() -> u64 {
    250
}
fn default_normal_interval() -> u64 {
    3000
}
fn default_cache_ttl() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            urgent_interval_ticks: default_urgent_interval(),
            normal_interval_ticks: default_normal_interval(),
            cache_ttl_ticks: default_cache_ttl(),
            level_mode: LevelMode::default(),
            neutral_score: 0.0,
        }
    }
}

impl EngineConfig {
    /// Check intervals: both non-zero, urgent strictly shorter than normal.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.urgent_interval_ticks == 0 || self.normal_interval_ticks == 0 {
            return Err(ConfigError::Invalid {
                message: "cadence intervals must be greater than zero".into(),
            });
        }
        if self.urgent_interval_ticks >= self.normal_interval_ticks {
            return Err(ConfigError::Invalid {
                message: format!(
                    "urgent interval ({}) must be shorter than normal interval ({})",
                    self.urgent_interval_ticks, self.normal_interval_ticks
                ),
            });
        }
        if !self.neutral_score.is_finite() {
            return Err(ConfigError::Invalid {
                message: "neutral_score must be a finite number".into(),
            });
        }
        Ok(())
    }

    /// Load and validate from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
