//! Error types for storage operations.

use crate::path::BackendKind;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No cached or remote value exists at the address.
    #[error("no value at {path:?}")]
    NotFound {
        /// Rendered address.
        path: String,
    },

    /// A payload exists but does not match the expected shape.
    #[error("failed to decode value at {path:?}: {message}")]
    DecodeFailed {
        /// Rendered address.
        path: String,
        /// Decoder message.
        message: String,
    },

    /// A value could not be turned into a payload the backend accepts.
    #[error("failed to encode value for {path:?}: {message}")]
    EncodeFailed {
        /// Rendered address.
        path: String,
        /// Encoder message.
        message: String,
    },

    /// The operation is not meaningful for the active backend.
    #[error("{operation} is not supported by the {backend} backend")]
    BackendUnsupported {
        /// Name of the rejected operation.
        operation: &'static str,
        /// Backend that rejected it.
        backend: BackendKind,
    },
}

impl StorageError {
    /// Creates a not-found error for the given address.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Returns true if no value exists at the address.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
