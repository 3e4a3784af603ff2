//! Snapshot error types.

use folio_storage::StorageError;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// No snapshot matches the reference within the document.
    #[error("Snapshot not found: version {version} of document {document_id}")]
    NotFound {
        document_id: String,
        version: String,
    },

    /// A version number could not be allocated; the whole call may be retried.
    #[error("Version conflict on document {document_id}: no free version number after {attempts} attempts")]
    Conflict { document_id: String, attempts: u32 },

    /// Input rejected before anything was allocated.
    #[error("Invalid snapshot: {0}")]
    Validation(String),

    /// Underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SnapshotError {
    /// Create a not found error.
    pub fn not_found(document_id: impl Into<String>, version: impl ToString) -> Self {
        Self::NotFound {
            document_id: document_id.into(),
            version: version.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
