//! Error types for Weave operations

use std::path::PathBuf;

/// Result type for Weave operations
pub type Result<T> = std::result::Result<T, WeaveError>;

/// Error types for the Weave library
#[derive(Debug, thiserror::Error)]
pub enum WeaveError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No API credential was configured for the provider
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    /// The provider answered with a non-success status
    #[error("LLM API error ({status}): {message}")]
    Api { status: String, message: String },

    /// Transport-level failure talking to the provider
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider answered but the body was unusable
    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    /// Context text produced no usable filename characters
    #[error("context produced empty slug")]
    EmptySlug,

    /// Refusing to overwrite an existing memory entry
    #[error("target already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for WeaveError {
    fn from(s: String) -> Self {
        WeaveError::Other(s)
    }
}

impl From<&str> for WeaveError {
    fn from(s: &str) -> Self {
        WeaveError::Other(s.to_string())
    }
}

impl From<reqwest::Error> for WeaveError {
    fn from(err: reqwest::Error) -> Self {
        WeaveError::Http(err.to_string())
    }
}
