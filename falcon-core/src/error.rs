//! Error types for falcon-core

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the falcon-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Model id not present in the registry
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Model exists but cannot be used for the requested operation
    #[error("Invalid {purpose} model: {model}")]
    InvalidModel { model: String, purpose: &'static str },

    /// Operation not supported by the chosen model (e.g. editing)
    #[error("{0}")]
    UnsupportedOperation(String),

    /// No API key could be resolved
    #[error("FAL_KEY not found. Set FAL_KEY environment variable or add apiKey to ~/.falcon/config.json")]
    MissingCredential,

    /// The service answered with an error detail, surfaced verbatim
    #[error("{0}")]
    Remote(String),

    /// Network-level failure or an unexpected response
    #[error("request failed: {0}")]
    Transport(String),

    /// User input rejected before any network call
    #[error("{0}")]
    Validation(String),

    /// Atomic write failed after the temp file was created
    #[error("failed to write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Result type alias for falcon-core
pub type Result<T> = std::result::Result<T, Error>;
