//! Error types
//!
//! Sculpting, meshing and scanning never fail: bad settings are clamped and
//! unusable inputs degrade to empty results. Only configuration persistence
//! touches the outside world and can report errors.

use thiserror::Error;

/// Configuration load/save errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or mistyped JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File extension other than `.json`
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),
}
