//! Error taxonomy
//!
//! Caller-input problems (`InvalidArgument`, `InvalidPath`, `InvalidSegment`)
//! surface directly. Anything that went wrong inside a backend is wrapped in a
//! [`StorageError`] that names the facade operation and keeps the adapter's
//! [`BackendError`] as its source.

use std::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;

use crate::naming::SegmentViolation;

/// Boxed error used to keep native SDK failures as sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures reported by a backend adapter.
///
/// Every adapter normalizes its native error types into these variants.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Object not found: {container}/{key}")]
    NotFound { container: String, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("{message}")]
    Request {
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BackendError {
    pub fn not_found(container: &str, key: &str) -> Self {
        BackendError::NotFound {
            container: container.to_string(),
            key: key.to_string(),
        }
    }

    pub fn request(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        BackendError::Request {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound { .. })
    }
}

/// Result type for backend adapter calls
pub type BackendResult<T> = Result<T, BackendError>;

/// Facade operation a [`StorageError`] was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Upload,
    Download,
    Delete,
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Operation::Upload => write!(f, "upload"),
            Operation::Download => write!(f, "download"),
            Operation::Delete => write!(f, "delete"),
        }
    }
}

/// Envelope for backend failures surfaced by the facade.
#[derive(Debug, Error)]
#[error("Storage {operation} failed: {source}")]
pub struct StorageError {
    pub operation: Operation,
    #[source]
    pub source: BackendError,
}

impl StorageError {
    pub fn new(operation: Operation, source: BackendError) -> Self {
        StorageError { operation, source }
    }

    pub fn is_not_found(&self) -> bool {
        self.source.is_not_found()
    }
}

/// Errors returned by the storage facade
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid segment '{segment}': {violation}")]
    InvalidSegment {
        segment: String,
        violation: SegmentViolation,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True when the backend reported the object (or its container) missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Storage(err) if err.is_not_found())
    }

    /// Operation of the wrapped backend failure, if this is one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Storage(err) => Some(err.operation),
            _ => None,
        }
    }
}

/// Result type for facade operations
pub type StorageResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_visible_through_envelope() {
        let err = Error::from(StorageError::new(
            Operation::Download,
            BackendError::not_found("my-bucket", "a/b"),
        ));
        assert!(err.is_not_found());
        assert_eq!(err.operation(), Some(Operation::Download));
        assert_eq!(
            err.to_string(),
            "Storage download failed: Object not found: my-bucket/a/b"
        );
    }

    #[test]
    fn test_request_error_keeps_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = StorageError::new(Operation::Upload, BackendError::request("put failed", io));
        assert!(!err.is_not_found());

        let backend = std::error::Error::source(&err).expect("backend source");
        let cause = backend.source().expect("native cause");
        assert_eq!(cause.to_string(), "reset by peer");
    }

    #[test]
    fn test_input_errors_carry_no_operation() {
        let err = Error::InvalidPath("empty".to_string());
        assert!(!err.is_not_found());
        assert_eq!(err.operation(), None);
    }
}
