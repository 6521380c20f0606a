//! Document reader joining headers, lines and catalog data.

use std::time::Instant;

use common::{DocumentId, VariantId};
use domain::{
    Attribute, CombinedLineItem, Document, DocumentItem, DocumentKind, ListRequest, Page, Variant,
    flatten,
};
use futures_util::future::try_join_all;
use store::{CatalogStore, DocumentStore};

use crate::error::{Result, ViewError};
use crate::read_model::DocumentDetail;

/// Read-only access to documents for the query side.
///
/// Joins have no ordering dependency on each other, so they are issued
/// concurrently.
pub struct DocumentReader<S, C>
where
    S: DocumentStore,
    C: CatalogStore,
{
    store: S,
    catalog: C,
}

impl<S, C> DocumentReader<S, C>
where
    S: DocumentStore,
    C: CatalogStore,
{
    /// Creates a new document reader.
    pub fn new(store: S, catalog: C) -> Self {
        Self { store, catalog }
    }

    /// Loads a document with its flattened lines and totals.
    #[tracing::instrument(skip(self))]
    pub async fn detail(&self, kind: DocumentKind, id: DocumentId) -> Result<DocumentDetail> {
        let started = Instant::now();

        let (document, items) = futures_util::try_join!(
            self.store.get_document(kind, id),
            self.store.get_items(kind, id),
        )?;
        let document = document.ok_or(ViewError::NotFound(id))?;
        let lines = self.combine_all(items).await?;

        let detail = DocumentDetail::new(document, lines);
        let orphaned = detail.orphaned_lines().count();
        if orphaned > 0 {
            tracing::debug!(document_id = %id, orphaned, "document has lines missing from the catalog");
        }
        if detail.totals_drifted() {
            tracing::warn!(
                document_id = %id,
                stored = %detail.document.total_amount,
                computed = %detail.totals.total,
                "stored total differs from lines"
            );
        }

        metrics::histogram!("document_read_duration_seconds", "view" => "detail")
            .record(started.elapsed().as_secs_f64());
        Ok(detail)
    }

    /// Returns only the flattened lines of a document.
    #[tracing::instrument(skip(self))]
    pub async fn lines(&self, kind: DocumentKind, id: DocumentId) -> Result<Vec<CombinedLineItem>> {
        let items = self.store.get_items(kind, id).await?;
        self.combine_all(items).await
    }

    /// Lists headers after validating the request.
    #[tracing::instrument(skip(self, request))]
    pub async fn list(&self, kind: DocumentKind, request: ListRequest) -> Result<Page<Document>> {
        let started = Instant::now();
        let query = request.validate()?;

        let page = self.store.list_documents(kind, &query).await?;
        tracing::debug!(
            total = page.total,
            page = page.page,
            pages = page.total_pages(),
            returned = page.items.len(),
            "documents listed"
        );

        metrics::histogram!("document_read_duration_seconds", "view" => "list")
            .record(started.elapsed().as_secs_f64());
        Ok(page)
    }

    async fn combine_all(&self, items: Vec<DocumentItem>) -> Result<Vec<CombinedLineItem>> {
        try_join_all(items.into_iter().map(|item| self.combine(item))).await
    }

    async fn combine(&self, item: DocumentItem) -> Result<CombinedLineItem> {
        let (product, variant, attributes) = futures_util::try_join!(
            self.catalog.get_product(item.product_id),
            self.variant(item.variant_id),
            self.attributes(item.variant_id),
        )?;
        Ok(flatten(item, product.as_ref(), variant.as_ref(), attributes))
    }

    async fn variant(&self, variant_id: Option<VariantId>) -> store::Result<Option<Variant>> {
        match variant_id {
            Some(id) => self.catalog.get_variant(id).await,
            None => Ok(None),
        }
    }

    async fn attributes(&self, variant_id: Option<VariantId>) -> store::Result<Vec<Attribute>> {
        match variant_id {
            Some(id) => self.catalog.get_variant_attributes(id).await,
            None => Ok(Vec::new()),
        }
    }
}
