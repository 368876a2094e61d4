//! Error types for the sync engine.

use kvmirror_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// Only loads return these to the caller. Failed writes and unaddressable
/// items are reported through the side channel configured on
/// [`crate::SyncConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The storage port rejected an operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A locally known item has no remote key yet.
    #[error("no remote key known for item {id} in {path:?}")]
    AddressUnmappable {
        /// Rendered collection address.
        path: String,
        /// Debug rendering of the local identifier.
        id: String,
    },
}

impl SyncError {
    /// Returns true if the error is an unaddressable item.
    pub fn is_unmappable(&self) -> bool {
        matches!(self, SyncError::AddressUnmappable { .. })
    }

    /// Returns true if the underlying storage had no value.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::Storage(err) if err.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_convert() {
        let err: SyncError = StorageError::not_found("todos/1").into();
        assert!(err.is_not_found());
        assert!(!err.is_unmappable());
        assert_eq!(err.to_string(), "storage error: no value at \"todos/1\"");
    }

    #[test]
    fn unmappable_display() {
        let err = SyncError::AddressUnmappable {
            path: "todos".into(),
            id: "7".into(),
        };
        assert!(err.is_unmappable());
        assert_eq!(err.to_string(), "no remote key known for item 7 in \"todos\"");
    }
}
