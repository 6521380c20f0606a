use async_trait::async_trait;
use common::{DocumentId, Version};
use domain::{
    Document, DocumentFields, DocumentItem, DocumentKind, DocumentStatus, ListQuery, NewDocument,
    NewDocumentItem, Page,
};

use crate::{Result, StoreError};

/// Options for header writes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Expected version of the header for optimistic concurrency control.
    /// If None, no version check is performed.
    pub expected_version: Option<Version>,
}

impl UpdateOptions {
    /// Creates options expecting the header to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }
}

/// Record store for document headers and their lines.
///
/// Purchases and sales live in separate tables, selected by `kind`. Every
/// call is a single remote round trip; there is no multi-call transaction.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a header and returns it with its generated id and version 1.
    async fn insert_document(&self, kind: DocumentKind, document: NewDocument) -> Result<Document>;

    /// Loads a header. Returns None if it doesn't exist.
    async fn get_document(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>>;

    /// Overwrites the editable header fields and bumps the version.
    ///
    /// Fails with `ConcurrencyConflict` if `options.expected_version` is set
    /// and doesn't match.
    async fn update_document(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        fields: DocumentFields,
        options: UpdateOptions,
    ) -> Result<Document>;

    /// Writes the status field and bumps the version.
    async fn set_status(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        status: DocumentStatus,
        options: UpdateOptions,
    ) -> Result<Document>;

    /// Deletes a header. The store refuses while lines still reference it.
    async fn delete_document(&self, kind: DocumentKind, id: DocumentId) -> Result<()>;

    /// Returns one page of headers matching the query.
    async fn list_documents(&self, kind: DocumentKind, query: &ListQuery) -> Result<Page<Document>>;

    /// Inserts a batch of lines for a document, all or nothing.
    async fn insert_items(
        &self,
        kind: DocumentKind,
        document_id: DocumentId,
        items: Vec<NewDocumentItem>,
    ) -> Result<Vec<DocumentItem>>;

    /// Returns the lines of a document in insertion order.
    async fn get_items(&self, kind: DocumentKind, document_id: DocumentId)
    -> Result<Vec<DocumentItem>>;

    /// Deletes all lines of a document and returns how many were removed.
    async fn delete_items(&self, kind: DocumentKind, document_id: DocumentId) -> Result<usize>;
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Loads a header, failing with `DocumentNotFound` if it doesn't exist.
    async fn require_document(&self, kind: DocumentKind, id: DocumentId) -> Result<Document> {
        self.get_document(kind, id)
            .await?
            .ok_or(StoreError::DocumentNotFound(id))
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
