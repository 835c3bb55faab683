//! Error types.
//!
//! None of these reach the host through the interaction surface: the engine
//! logs and absorbs them, degrading to fallback artwork or no-ops.

use thiserror::Error;

/// Artwork loading and parsing errors.
#[derive(Debug, Error)]
pub enum ArtworkError {
    #[error("Malformed artwork markup: {0}")]
    Xml(String),
    #[error("Invalid attribute {name}: {value}")]
    InvalidAttribute { name: String, value: String },
    #[error("Artwork has no <svg> root element")]
    MissingRoot,
    #[error("IO error: {0}")]
    Io(String),
    #[error("Artwork source error: {0}")]
    Source(String),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
