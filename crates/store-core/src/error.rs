//! Error types for the file handler

use thiserror::Error;

/// Result type alias using the file handler Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type shared by the storage transports and the file handler
#[derive(Error, Debug)]
pub enum Error {
    // Path errors
    #[error("Malformed path: {path} ({reason})")]
    MalformedPath { path: String, reason: String },

    #[error("Input path or filename does not exist: {path} / {filename}")]
    NotFound { path: String, filename: String },

    // Storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Storage backend not available: {backend}")]
    StorageUnavailable { backend: String },

    #[error("Storage path not found: {path}")]
    StoragePathNotFound { path: String },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // Frame errors
    #[error("Frame has {actual} columns, more than the allowed {limit}")]
    ColumnLimitExceeded { limit: usize, actual: usize },

    #[error("Column not found in frame: {column}")]
    UnknownColumn { column: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Storage { .. } | Error::StorageUnavailable { .. }
        )
    }

    /// Returns true if the error means the target simply is not there
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. } | Error::StoragePathNotFound { .. }
        ) || matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::InvalidConfig {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let err = Error::Storage {
            message: "connection reset".to_string(),
        };
        assert!(err.is_retryable());

        let err = Error::StoragePathNotFound {
            path: "bucket/key".to_string(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_error_not_found() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::Io(io).is_not_found());

        let err = Error::StoragePathNotFound {
            path: "a".to_string(),
        };
        assert!(err.is_not_found());

        let err = Error::Storage {
            message: "boom".to_string(),
        };
        assert!(!err.is_not_found());
    }
}
