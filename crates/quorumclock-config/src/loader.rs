//! Configuration loader with multi-source merging

use crate::{Paths, QuorumClockConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "QCLK".to_string(),
            user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "QCLK")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/quorumclock/config.toml
    pub fn without_user_config(mut self) -> Self {
        self.user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<QuorumClockConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = QuorumClockConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2-4. User, project, then local files. Missing files are skipped.
        let user_config_file = self
            .user_config
            .then(|| Paths::new().user_config_file().ok())
            .flatten();
        let files = user_config_file.into_iter().chain([
            Paths::project_config_file(&self.project_dir),
            Paths::local_config_file(&self.project_dir),
        ]);
        for file in files {
            builder = builder.add_source(
                config::File::from(file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (QCLK_MATRIX__MAX_ATTACHED=...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let quorumclock_config: QuorumClockConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        quorumclock_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(quorumclock_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> QuorumClockConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
