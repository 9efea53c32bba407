//! # Conductor Configuration Errors
//!
//! Defines error types for reading and validating the orchestrator
//! configuration file: I/O failures, unknown formats, parse failures and
//! descriptor lists that cannot form a valid table.
use std::path::PathBuf;
use thiserror::Error;

use crate::kernel::error::BoxError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not {operation} '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unrecognised configuration file extension: {0}")]
    UnsupportedConfigFormat(PathBuf),

    #[error("Could not parse {format} configuration: {source}")]
    DeserializationError { format: String, source: BoxError },

    #[error("Could not render configuration as {format}: {source}")]
    SerializationError { format: String, source: BoxError },

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }
}
