//! Read side error types.

use common::DocumentId;
use domain::ValidationError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while reading documents.
#[derive(Debug, Error)]
pub enum ViewError {
    /// The list request was malformed.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The document does not exist.
    #[error("Document not found: {0}")]
    NotFound(DocumentId),

    /// The document or catalog store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for read operations.
pub type Result<T> = std::result::Result<T, ViewError>;
