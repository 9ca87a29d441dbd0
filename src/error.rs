//! Error types for the calculator plugin
//!
//! Evaluation problems are not errors: they are diagnostics returned by the
//! engine (see [`crate::core::Outcome`]). These are the failures around it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the plugin
#[derive(Debug, Error)]
pub enum QalcError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Definition or exchange rate files that exist but cannot be used
    #[error("Failed to load {path}: {message}")]
    Definitions { path: PathBuf, message: String },

    /// Clipboard operation errors
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// Failed to hand a URL to the system opener
    #[error("Open URL error: {0}")]
    OpenUrl(String),

    /// Plugin initialization failed or was dropped before finishing
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("Config serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Result type alias for plugin operations
pub type QalcResult<T> = Result<T, QalcError>;
