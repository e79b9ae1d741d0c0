//! Error types for parihara-nav

use thiserror::Error;

/// parihara-nav error type
#[derive(Error, Debug)]
pub enum PariharaError {
    /// Reading a configuration file failed.
    #[error("Configuration I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration value was missing, malformed, or out of range.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for PariharaError {
    fn from(e: toml::de::Error) -> Self {
        PariharaError::Config(e.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PariharaError>;
