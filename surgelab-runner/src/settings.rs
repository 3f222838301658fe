//! Sweep settings loaded from TOML.
//!
//! One file describes a whole analysis: the base strategy, the parameters to
//! permute and how the sweep runs (history size, deadline, threading).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use surgelab_core::config::ConfigError;
use surgelab_core::{ParamDescriptor, Permutable, StrategyConfig};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("strategy config error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid sweep setting: {0}")]
    Invalid(String),
}

/// How the sweep runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepOptions {
    /// Best configurations kept, newest best first.
    pub history_capacity: usize,
    /// Replay the charts of a grid point in parallel.
    pub parallel_charts: bool,
    /// Worker threads for chart replay; 0 uses the global rayon pool.
    pub threads: usize,
    /// Stop starting new grid points after this many seconds.
    pub deadline_secs: Option<u64>,
    /// Put a bounded queue of this size in front of each chart's executor.
    pub executor_queue_capacity: Option<usize>,
    /// Parameters to permute. Empty means the built-in catalog.
    pub params: Vec<ParamDescriptor>,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            parallel_charts: true,
            threads: 0,
            deadline_secs: None,
            executor_queue_capacity: None,
            params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub strategy: StrategyConfig,
    pub sweep: SweepOptions,
}

impl SweepSettings {
    pub fn from_toml_str(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.strategy.validate()?;
        if self.sweep.history_capacity == 0 {
            return Err(SettingsError::Invalid(
                "history_capacity must be at least 1".into(),
            ));
        }
        if self.sweep.executor_queue_capacity == Some(0) {
            return Err(SettingsError::Invalid(
                "executor_queue_capacity must be at least 1".into(),
            ));
        }
        if self.sweep.deadline_secs == Some(0) {
            return Err(SettingsError::Invalid(
                "deadline_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Descriptors to sweep: the declared ones, or those the strategy offers.
    pub fn descriptors(&self) -> Vec<ParamDescriptor> {
        if self.sweep.params.is_empty() {
            self.strategy.permutable_descriptors()
        } else {
            self.sweep.params.clone()
        }
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.sweep.deadline_secs.map(Duration::from_secs)
    }
}
