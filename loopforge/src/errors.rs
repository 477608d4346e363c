//! Error types for the loopforge orchestrator.
//!
//! The taxonomy mirrors the failure classes the pipeline distinguishes:
//! configuration problems are fatal and never retried, IO problems surface
//! from the filesystem layer, and notification problems stay inside the
//! notifier boundary.

use thiserror::Error;

/// The main error type for loopforge operations.
#[derive(Debug, Error)]
pub enum LoopForgeError {
    /// Missing or invalid configuration. Fatal, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration document could not be parsed.
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A notification channel failed to deliver.
    #[error("Notification error: {0}")]
    Notification(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoopForgeError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns true if the error is a configuration error.
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ConfigParse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = LoopForgeError::config("missing api key");
        assert_eq!(err.to_string(), "Configuration error: missing api key");
        assert!(err.is_config());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LoopForgeError = io.into();
        assert!(err.to_string().contains("gone"));
        assert!(!err.is_config());
    }
}
