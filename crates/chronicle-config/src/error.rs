//! Configuration error types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("failed to read thread-id bit width from {path}: {source}")]
    ThreadBitsDetection {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
