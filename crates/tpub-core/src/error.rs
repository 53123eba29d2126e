//! Unified error types for tpub

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all tpub operations
#[derive(Error, Debug)]
pub enum TpubError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    // Session errors
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    #[error("Editor mode switch failed: {0}")]
    ModeSwitch(String),

    #[error("Image upload failed: {0}")]
    ImageUpload(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    // Upstream API errors
    #[error("API error: {0}")]
    Api(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Retry exhausted after {attempts} attempts: {last_error}")]
    RetryExhausted { attempts: u32, last_error: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

impl TpubError {
    /// Whether this error ends the whole publishing run.
    ///
    /// Recoverable errors (a single image, tags, category) are logged and
    /// skipped by the workflow instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TpubError::Configuration(_)
                | TpubError::MissingInput(_)
                | TpubError::Auth(_)
                | TpubError::ModeSwitch(_)
                | TpubError::Publish(_)
        )
    }

    /// Transient upstream failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, TpubError::RateLimited(_))
    }
}

/// Result type alias using TpubError
pub type Result<T> = std::result::Result<T, TpubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TpubError::Auth("timeout".into()).is_fatal());
        assert!(TpubError::ModeSwitch("raw surface hidden".into()).is_fatal());
        assert!(TpubError::Publish("no button".into()).is_fatal());
        assert!(!TpubError::ImageUpload("input missing".into()).is_fatal());
        assert!(!TpubError::ElementNotFound {
            locator: "#tagText".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_only_rate_limits_are_retryable() {
        assert!(TpubError::RateLimited("429".into()).is_retryable());
        assert!(!TpubError::Api("400".into()).is_retryable());
    }

    #[test]
    fn test_retry_exhausted_message() {
        let err = TpubError::RetryExhausted {
            attempts: 4,
            last_error: "429".into(),
        };
        assert_eq!(err.to_string(), "Retry exhausted after 4 attempts: 429");
    }
}
