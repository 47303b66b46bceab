//! Error types for the catalog engine

use hyper::StatusCode;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the catalog engine and daemon
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// Malformed id, duplicate id, unknown filter operator or non-string leaf
    #[error("Validation error: {0}")]
    Validation(String),

    /// The addressed record or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// An internal invariant of the store was violated
    #[error("Consistency error: {0}")]
    Consistency(String),

    // =========================================================================
    // Serialization Errors
    // =========================================================================
    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // =========================================================================
    // Daemon Errors
    // =========================================================================
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a `NotFound` error naming the missing id.
    pub fn not_found(id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("no entry with id {}", id))
    }

    /// True when the error reports a missing record or resource.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True when the error reports bad caller input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// HTTP status an API layer should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::Validation("bad id".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::not_found("a/b").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::Consistency("missing resource".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("abc/dev1");
        assert!(err.is_not_found());
        assert!(!err.is_validation());
        assert_eq!(err.to_string(), "Not found: no entry with id abc/dev1");
    }
}
