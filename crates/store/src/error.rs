use std::time::Duration;

use common::{DocumentId, Version};
use thiserror::Error;

/// Errors returned by the document and catalog stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The header was written by someone else since it was read.
    #[error(
        "Concurrency conflict for document {document_id}: expected {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        document_id: DocumentId,
        expected: Version,
        actual: Version,
    },

    /// The document does not exist.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// The store refused the write (constraint violation, permission, ...).
    #[error("Store rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The call did not finish in time.
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
