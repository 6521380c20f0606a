use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{DocumentId, ItemId, Version};
use domain::{
    Document, DocumentFields, DocumentItem, DocumentKind, DocumentStatus, ListQuery, NewDocument,
    NewDocumentItem, Page,
};
use tokio::sync::RwLock;

use crate::store::{DocumentStore, UpdateOptions};
use crate::{Result, StoreError};

/// Store operations that can be made to fail or stall in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertDocument,
    GetDocument,
    UpdateDocument,
    SetStatus,
    DeleteDocument,
    ListDocuments,
    InsertItems,
    GetItems,
    DeleteItems,
}

impl FailPoint {
    fn operation(&self) -> &'static str {
        match self {
            FailPoint::InsertDocument => "insert_document",
            FailPoint::GetDocument => "get_document",
            FailPoint::UpdateDocument => "update_document",
            FailPoint::SetStatus => "set_status",
            FailPoint::DeleteDocument => "delete_document",
            FailPoint::ListDocuments => "list_documents",
            FailPoint::InsertItems => "insert_items",
            FailPoint::GetItems => "get_items",
            FailPoint::DeleteItems => "delete_items",
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryState {
    documents: HashMap<DocumentId, Document>,
    items: HashMap<DocumentId, Vec<DocumentItem>>,
    failing: HashSet<FailPoint>,
    failing_once: HashSet<FailPoint>,
    delays: HashMap<FailPoint, Duration>,
}

impl InMemoryState {
    fn document(&self, kind: DocumentKind, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id).filter(|d| d.kind == kind)
    }

    fn document_mut(&mut self, kind: DocumentKind, id: DocumentId) -> Result<&mut Document> {
        self.documents
            .get_mut(&id)
            .filter(|d| d.kind == kind)
            .ok_or(StoreError::DocumentNotFound(id))
    }

    fn item_count(&self, id: DocumentId) -> usize {
        self.items.get(&id).map_or(0, Vec::len)
    }
}

fn check_version(document: &Document, options: UpdateOptions) -> Result<()> {
    match options.expected_version {
        Some(expected) if !document.version.satisfies(Some(expected)) => {
            Err(StoreError::ConcurrencyConflict {
                document_id: document.id,
                expected,
                actual: document.version,
            })
        }
        _ => Ok(()),
    }
}

/// In-memory document store for tests and the demo server.
///
/// Mirrors the relational store's constraints: lines need an existing
/// header and a header can't be deleted while lines reference it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures an operation to fail until cleared.
    pub async fn set_fail_on(&self, point: FailPoint, fail: bool) {
        let mut state = self.state.write().await;
        if fail {
            state.failing.insert(point);
        } else {
            state.failing.remove(&point);
        }
    }

    /// Makes only the next call of an operation fail.
    pub async fn fail_once_on(&self, point: FailPoint) {
        self.state.write().await.failing_once.insert(point);
    }

    /// Delays an operation by `delay` before it runs.
    pub async fn set_delay_on(&self, point: FailPoint, delay: Duration) {
        self.state.write().await.delays.insert(point, delay);
    }

    /// Returns the number of stored headers of a kind.
    pub async fn document_count(&self, kind: DocumentKind) -> usize {
        self.state
            .read()
            .await
            .documents
            .values()
            .filter(|d| d.kind == kind)
            .count()
    }

    /// Returns the number of lines stored for a document.
    pub async fn item_count(&self, document_id: DocumentId) -> usize {
        self.state.read().await.item_count(document_id)
    }

    async fn enter(&self, point: FailPoint) -> Result<()> {
        let (delay, failing) = {
            let mut state = self.state.write().await;
            let once = state.failing_once.remove(&point);
            (
                state.delays.get(&point).copied(),
                once || state.failing.contains(&point),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(StoreError::Unavailable(format!(
                "injected failure on {}",
                point.operation()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_document(&self, kind: DocumentKind, document: NewDocument) -> Result<Document> {
        self.enter(FailPoint::InsertDocument).await?;

        let now = Utc::now();
        let fields = document.fields;
        let stored = Document {
            id: DocumentId::new(),
            kind,
            business_id: document.business_id,
            code: fields.code,
            counterparty_id: fields.counterparty_id,
            date: fields.date,
            status: document.status,
            payment_status: fields.payment_status,
            subtotal: fields.subtotal,
            discount: fields.discount,
            tax_rate: fields.tax_rate,
            tax_amount: fields.tax_amount,
            total_amount: fields.total_amount,
            notes: fields.notes,
            version: Version::first(),
            created_at: now,
            updated_at: now,
        };

        let mut state = self.state.write().await;
        if state
            .documents
            .values()
            .any(|d| d.kind == kind && d.business_id == stored.business_id && d.code == stored.code)
        {
            return Err(StoreError::Rejected {
                operation: "insert_document",
                reason: format!("duplicate code {}", stored.code),
            });
        }
        state.documents.insert(stored.id, stored.clone());
        tracing::debug!(document_id = %stored.id, %kind, "document inserted");
        Ok(stored)
    }

    async fn get_document(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>> {
        self.enter(FailPoint::GetDocument).await?;
        Ok(self.state.read().await.document(kind, id).cloned())
    }

    async fn update_document(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        fields: DocumentFields,
        options: UpdateOptions,
    ) -> Result<Document> {
        self.enter(FailPoint::UpdateDocument).await?;

        let mut state = self.state.write().await;
        let document = state.document_mut(kind, id)?;
        check_version(document, options)?;
        document.apply_fields(fields);
        document.version = document.version.bumped();
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn set_status(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        status: DocumentStatus,
        options: UpdateOptions,
    ) -> Result<Document> {
        self.enter(FailPoint::SetStatus).await?;

        let mut state = self.state.write().await;
        let document = state.document_mut(kind, id)?;
        check_version(document, options)?;
        document.status = status;
        document.version = document.version.bumped();
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn delete_document(&self, kind: DocumentKind, id: DocumentId) -> Result<()> {
        self.enter(FailPoint::DeleteDocument).await?;

        let mut state = self.state.write().await;
        state.document_mut(kind, id)?;
        if state.item_count(id) > 0 {
            return Err(StoreError::Rejected {
                operation: "delete_document",
                reason: format!("document {id} still has items"),
            });
        }
        state.documents.remove(&id);
        state.items.remove(&id);
        Ok(())
    }

    async fn list_documents(&self, kind: DocumentKind, query: &ListQuery) -> Result<Page<Document>> {
        self.enter(FailPoint::ListDocuments).await?;

        let state = self.state.read().await;
        let mut matching: Vec<&Document> = state
            .documents
            .values()
            .filter(|d| d.kind == kind && query.filter.matches(d))
            .collect();
        matching.sort_by(|a, b| query.sort.compare(a, b).then_with(|| a.id.cmp(&b.id)));

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .cloned()
            .collect();

        Ok(Page {
            items,
            page: query.page,
            page_size: query.page_size,
            total,
        })
    }

    async fn insert_items(
        &self,
        kind: DocumentKind,
        document_id: DocumentId,
        items: Vec<NewDocumentItem>,
    ) -> Result<Vec<DocumentItem>> {
        self.enter(FailPoint::InsertItems).await?;

        let mut state = self.state.write().await;
        state.document_mut(kind, document_id)?;

        let now = Utc::now();
        let inserted: Vec<DocumentItem> = items
            .into_iter()
            .map(|item| DocumentItem {
                id: ItemId::new(),
                document_id,
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                discount: item.discount,
                bar_code: item.bar_code,
                original_product_name: item.original_product_name,
                original_variant_name: item.original_variant_name,
                created_at: now,
            })
            .collect();

        state
            .items
            .entry(document_id)
            .or_default()
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn get_items(
        &self,
        kind: DocumentKind,
        document_id: DocumentId,
    ) -> Result<Vec<DocumentItem>> {
        self.enter(FailPoint::GetItems).await?;

        let state = self.state.read().await;
        if state.document(kind, document_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(state.items.get(&document_id).cloned().unwrap_or_default())
    }

    async fn delete_items(&self, kind: DocumentKind, document_id: DocumentId) -> Result<usize> {
        self.enter(FailPoint::DeleteItems).await?;

        let mut state = self.state.write().await;
        state.document_mut(kind, document_id)?;
        Ok(state.items.remove(&document_id).map_or(0, |items| items.len()))
    }
}
