//! Error types for skytrace
//!
//! Errors fall into two families: configuration errors, which are raised
//! before any request leaves the process, and run errors, which the HTTP
//! engine raises while a flow is executing.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for skytrace
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("No target defined. Set 'config.target' (or 'target' in the flow header), or pass --target")]
    MissingTarget,

    #[error("Unrecognized flow document: {0}")]
    UnrecognizedShape(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Run Errors ===
    #[error("Invalid step {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed capture '{name}': {reason}")]
    CaptureFailed { name: String, reason: String },

    // === Watch Errors ===
    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create an invalid step error
    pub fn invalid_step(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidStep {
            index,
            reason: reason.into(),
        }
    }

    /// Create a failed capture error
    pub fn capture_failed(name: &str, reason: impl Into<String>) -> Self {
        Self::CaptureFailed {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error belongs to the configuration family.
    ///
    /// Configuration errors are surfaced before any network activity.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::ConfigParse(_)
                | Error::MissingTarget
                | Error::UnrecognizedShape(_)
                | Error::FileRead { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_family() {
        assert!(Error::MissingTarget.is_config());
        assert!(Error::UnrecognizedShape("empty".into()).is_config());
        assert!(!Error::invalid_step(2, "unknown step 'fetch'").is_config());
        assert!(!Error::capture_failed("id", "not found").is_config());
    }

    #[test]
    fn test_messages() {
        let err = Error::capture_failed("token", "$.auth.token not found");
        assert_eq!(err.to_string(), "Failed capture 'token': $.auth.token not found");
        let err = Error::invalid_step(1, "expected a single key");
        assert_eq!(err.to_string(), "Invalid step 1: expected a single key");
    }
}
