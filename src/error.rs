//! Error types for the key-value storage library
//!
//! This module provides a unified error handling system using `thiserror` for
//! every storage backend. A missing key is never an error: adapters surface
//! absence as `None`.

use thiserror::Error;

/// The main error type for the key-value storage library
#[derive(Error, Debug)]
pub enum Error {
    /// Storage operation errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Stored text could not be parsed back into the requested type
    #[error("Failed to decode value for key {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Value could not be serialized
    #[error("Failed to encode value for key {key}: {reason}")]
    Encode { key: String, reason: String },

    /// Storage backend cannot be opened or used
    #[error("Storage backend not available: {backend}: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// Storage operation failed
    #[error("Storage operation failed: {operation}: {reason}")]
    OperationFailed { operation: String, reason: String },
}

impl StorageError {
    /// Whether this error means the stored data is unreadable, as opposed to
    /// the backend failing.
    pub fn is_decode(&self) -> bool {
        matches!(self, StorageError::Decode { .. })
    }

    pub(crate) fn operation(operation: &str, reason: impl std::fmt::Display) -> Self {
        StorageError::OperationFailed {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Convenience type alias for Storage Results
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let storage_error = StorageError::Decode {
            key: "yolo".to_string(),
            reason: "expected value".to_string(),
        };
        let error = Error::Storage(storage_error);
        assert!(error.to_string().contains("Storage error"));
        assert!(error.to_string().contains("Failed to decode value for key yolo"));
    }

    #[test]
    fn test_is_decode() {
        let decode = StorageError::Decode {
            key: "k".to_string(),
            reason: "bad".to_string(),
        };
        assert!(decode.is_decode());
        assert!(!StorageError::operation("get_item", "disk full").is_decode());
    }

    #[test]
    fn test_operation_helper() {
        let error = StorageError::operation("set_item", "locked");
        assert_eq!(error.to_string(), "Storage operation failed: set_item: locked");
    }
}
