//! Configuration management for quorumclock
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (QCLK_* prefix, `__` between nesting levels)
//! 2. quorumclock.local.toml (gitignored, local overrides)
//! 3. quorumclock.toml (git-tracked, project config)
//! 4. ~/.config/quorumclock/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use quorumclock_types::{MAX_CAPACITY, VCLOCK_MAX};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main quorumclock configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuorumClockConfig {
    pub matrix: MatrixConfig,
}

/// Sizing of a matrix clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Replica ids accepted are `[0, capacity)`.
    pub capacity: usize,

    /// Maximum number of replicas attached at once. Defaults to `capacity`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attached: Option<usize>,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            capacity: VCLOCK_MAX,
            max_attached: None,
        }
    }
}

impl MatrixConfig {
    /// Effective attach limit
    pub fn attach_limit(&self) -> usize {
        self.max_attached.unwrap_or(self.capacity)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(ConfigError::ValidationError(format!(
                "matrix.capacity must be in 1..={MAX_CAPACITY}, got {}",
                self.capacity
            )));
        }

        let limit = self.attach_limit();
        if limit == 0 || limit > self.capacity {
            return Err(ConfigError::ValidationError(format!(
                "matrix.max_attached must be in 1..={}, got {limit}",
                self.capacity
            )));
        }

        Ok(())
    }
}

impl QuorumClockConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without merging other sources
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matrix.validate()
    }
}
