//! Error types for the deployment hooks.

use std::path::PathBuf;

use fwdeploy_common::UnknownName;

/// A single failed readiness probe.
///
/// Every variant means "not ready yet" to the gate; none of them end the loop.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("Connection attempt timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Failure to compress one asset. Contained by the run, never propagated.
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("Failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl CompressError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            CompressError::Stat { path, .. }
            | CompressError::Read { path, .. }
            | CompressError::Write { path, .. } => path,
        }
    }
}

/// Errors that stop a command before any hook runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown target or alias: {0}")]
    UnknownTarget(String),

    #[error("Dependency cycle involving target {0}")]
    DependencyCycle(String),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<UnknownName> for Error {
    fn from(err: UnknownName) -> Self {
        Error::UnknownTarget(err.0)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
