//! Error types for the push and correlation workflow

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PublisherError>;

#[derive(Error, Debug)]
pub enum PublisherError {
    /// Container engine invocation failed (push, digest query, login)
    #[error("Container engine error: {0}")]
    Engine(String),
    /// A layer resolver found no matching artifacts
    #[error("Layer resolution error: {0}")]
    Resolution(String),
    /// The assembler produced no module despite reporting no error
    #[error("failed to create build info module: module is nil")]
    ModuleNil,
    /// Build-info general details or module save failed
    #[error("Build info persistence error: {0}")]
    Persistence(String),
    /// Transfer manifest could not be written to temp storage
    #[error("Transfer manifest serialization error: {0}")]
    Serialization(String),
    /// Network related errors
    #[error("Network error: {0}")]
    Network(String),
    /// Artifact repository returned an unexpected response
    #[error("Repository error: {0}")]
    Repository(String),
    /// Authentication errors
    #[error("Authentication error: {0}")]
    Auth(String),
    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// File IO errors
    #[error("IO error: {0}")]
    Io(String),
    /// Parse errors
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<std::io::Error> for PublisherError {
    fn from(err: std::io::Error) -> Self {
        PublisherError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PublisherError {
    fn from(err: serde_json::Error) -> Self {
        PublisherError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for PublisherError {
    fn from(err: reqwest::Error) -> Self {
        PublisherError::Network(err.to_string())
    }
}

impl From<url::ParseError> for PublisherError {
    fn from(err: url::ParseError) -> Self {
        PublisherError::Validation(err.to_string())
    }
}
