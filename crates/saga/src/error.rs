//! Document service error types.

use common::{DocumentId, Version};
use domain::ValidationError;
use store::StoreError;
use thiserror::Error;

use crate::instance::CompensationFailure;
use crate::services::LedgerError;

/// Errors returned by document operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Malformed input; nothing was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A referenced document, product or variant does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The header changed since it was read.
    #[error("Conflict on document {document_id}: expected {expected}, found {actual}")]
    Conflict {
        document_id: DocumentId,
        expected: Version,
        actual: Version,
    },

    /// The document store failed at `step`.
    #[error("Persistence failed at step '{step}': {source}")]
    Persistence {
        step: &'static str,
        document_id: Option<DocumentId>,
        #[source]
        source: StoreError,
    },

    /// The inventory ledger failed at `step`.
    #[error("Ledger failed at step '{step}' for document {document_id}: {source}")]
    Ledger {
        step: &'static str,
        document_id: DocumentId,
        #[source]
        source: LedgerError,
    },

    /// A step failed and at least one compensation failed too.
    #[error(
        "Partial failure at step '{step}' for document {document_id}: {reason}; manual reconciliation required"
    )]
    PartialFailure {
        step: &'static str,
        document_id: DocumentId,
        reason: String,
        failed_compensations: Vec<CompensationFailure>,
    },
}

impl DocumentError {
    pub fn document_not_found(id: DocumentId) -> Self {
        DocumentError::NotFound {
            entity: "document",
            id: id.to_string(),
        }
    }

    /// Maps a store failure at `step`, surfacing missing rows and version
    /// conflicts as their own variants.
    pub fn from_store(step: &'static str, document_id: Option<DocumentId>, err: StoreError) -> Self {
        match err {
            StoreError::DocumentNotFound(id) => Self::document_not_found(id),
            StoreError::ConcurrencyConflict {
                document_id,
                expected,
                actual,
            } => DocumentError::Conflict {
                document_id,
                expected,
                actual,
            },
            source => DocumentError::Persistence {
                step,
                document_id,
                source,
            },
        }
    }

    /// Returns true if the data may be inconsistent and needs an operator.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, DocumentError::PartialFailure { .. })
    }

    /// Short label used for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DocumentError::Validation(_) => "validation",
            DocumentError::NotFound { .. } => "not_found",
            DocumentError::Conflict { .. } => "conflict",
            DocumentError::Persistence { .. } => "persistence",
            DocumentError::Ledger { .. } => "ledger",
            DocumentError::PartialFailure { .. } => "partial_failure",
        }
    }
}

/// Convenience type alias for document service results.
pub type Result<T> = std::result::Result<T, DocumentError>;
