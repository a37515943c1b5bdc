//! # Core Error Types

use thiserror::Error;

/// Errors from coordinate parsing and configuration handling.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Region key string did not parse as `"x,z"`.
    #[error("invalid region key: {0:?}")]
    InvalidRegionKey(String),

    /// Configuration file could not be read.
    #[error("config read failed: {0}")]
    ConfigRead(#[source] std::io::Error),

    /// Configuration file was not valid TOML.
    #[error("config parse failed: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration file could not be written.
    #[error("config write failed: {0}")]
    ConfigWrite(#[source] std::io::Error),

    /// Configuration could not be serialized.
    #[error("config serialize failed: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
