//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from reading or validating a quorumclock configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("cannot parse config {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Values parsed but describe an impossible matrix.
    #[error("invalid configuration: {0}")]
    ValidationError(String),

    /// No home directory to derive the user config location from.
    #[error("cannot locate user config directory: {0}")]
    XdgError(String),
}
