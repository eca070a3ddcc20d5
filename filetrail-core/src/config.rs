// Copyright 2025 Filetrail Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration for the history engine
//!
//! Settings can come from a TOML file, from `FILETRAIL_*` environment
//! variables, or from defaults. Priority: file > env > defaults.

use crate::error::FiletrailError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of materialized trees kept in the checkout cache
pub const DEFAULT_CACHE_CAPACITY: u64 = 128;

/// Default name of the line that events are applied to
pub const DEFAULT_BRANCH: &str = "main";

/// Engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Maximum number of materialized trees held by the checkout cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// Branch created by the first applied event
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Directory for persisted objects and refs (None = in-memory only)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Author recorded on commits
    #[serde(default = "default_author")]
    pub author: String,
}

fn default_cache_capacity() -> u64 {
    DEFAULT_CACHE_CAPACITY
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_author() -> String {
    "filetrail".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            default_branch: default_branch(),
            data_dir: None,
            author: default_author(),
        }
    }
}

impl EngineConfig {
    /// In-memory configuration with a custom cache size
    pub fn in_memory(cache_capacity: u64) -> Self {
        Self {
            cache_capacity,
            ..Self::default()
        }
    }

    /// Configuration persisting to `data_dir`
    pub fn persistent(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Self::default()
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - FILETRAIL_CACHE_CAPACITY: materialization cache size (default: 128)
    /// - FILETRAIL_DEFAULT_BRANCH: initial branch name (default: main)
    /// - FILETRAIL_DATA_DIR: persistence directory (default: unset, in-memory)
    /// - FILETRAIL_AUTHOR: commit author (default: filetrail)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(capacity) = std::env::var("FILETRAIL_CACHE_CAPACITY") {
            if let Ok(val) = capacity.parse() {
                config.cache_capacity = val;
            }
        }

        if let Ok(branch) = std::env::var("FILETRAIL_DEFAULT_BRANCH") {
            config.default_branch = branch;
        }

        if let Ok(dir) = std::env::var("FILETRAIL_DATA_DIR") {
            config.data_dir = Some(PathBuf::from(dir));
        }

        if let Ok(author) = std::env::var("FILETRAIL_AUTHOR") {
            config.author = author;
        }

        config
    }

    /// Load configuration with priority: file > env > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using environment", path);
                Self::from_env()
            }
            None => Self::from_env(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> std::result::Result<(), FiletrailError> {
        if self.cache_capacity == 0 {
            return Err(FiletrailError::Config(
                "cache_capacity must be at least 1".to_string(),
            ));
        }
        if self.default_branch.trim().is_empty() {
            return Err(FiletrailError::Config(
                "default_branch must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
