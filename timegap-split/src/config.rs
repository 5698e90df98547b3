//! Run configuration for the command line tool.
//!
//! Loaded from TOML; every field is optional so command line flags can
//! fill in or override what the file leaves out.
//!
//! ```toml
//! [data]
//! path = "data/rows.csv"
//! time_column = "date"
//!
//! [split]
//! train_duration = "10d"
//! valid_duration = "2d"
//! gap_duration = "1d"
//! window = "rolling"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::split::window::duration_literal;
use crate::split::{WindowConfig, WindowMode};

/// Default name of the timestamp column.
pub const DEFAULT_TIME_COLUMN: &str = "date";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Missing setting: {0}")]
    Missing(&'static str),
}

/// Input data settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV or Parquet file.
    pub path: Option<PathBuf>,
    /// Name of the timestamp column.
    pub time_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: None,
            time_column: DEFAULT_TIME_COLUMN.to_string(),
        }
    }
}

/// Split settings; turned into a `WindowConfig` once merged with flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    #[serde(with = "duration_literal::option")]
    pub train_duration: Option<Duration>,
    #[serde(with = "duration_literal::option")]
    pub valid_duration: Option<Duration>,
    #[serde(with = "duration_literal::option")]
    pub gap_duration: Option<Duration>,
    pub n_splits: Option<usize>,
    pub window: Option<WindowMode>,
}

impl SplitConfig {
    /// Build the window configuration. `valid_duration` is required, the
    /// gap defaults to zero and the window to rolling.
    pub fn to_window_config(&self) -> Result<WindowConfig, ConfigError> {
        let valid = self
            .valid_duration
            .ok_or(ConfigError::Missing("split.valid_duration"))?;

        Ok(WindowConfig {
            train_duration: self.train_duration,
            valid_duration: valid,
            gap_duration: self.gap_duration.unwrap_or_else(Duration::zero),
            n_splits: self.n_splits,
            window: self.window.unwrap_or_default(),
        })
    }
}

/// Complete run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
}

impl RunConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
