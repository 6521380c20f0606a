//! Document service orchestrating header, line and ledger writes.

use std::future::Future;
use std::time::Instant;

use chrono::NaiveDate;
use common::{DocumentId, VariantId, Version};
use domain::{
    Document, DocumentFields, DocumentHeader, DocumentItem, DocumentKind, DocumentStatus,
    NewDocument, NewDocumentItem, Product, Totals, ValidationError, Variant, validate_document,
};
use futures_util::future::try_join_all;
use store::{CatalogStore, DocumentStore, StoreError, UpdateOptions};

use crate::config::ServiceConfig;
use crate::error::{DocumentError, Result};
use crate::instance::{Compensation, SagaInstance};
use crate::services::{InventoryLedger, LedgerError, MovementKind, StockLine};
use crate::state::SagaState;
use crate::steps::*;

/// Runs the document lifecycle against the store, catalog and ledger.
///
/// The store offers no multi-call transaction, so every mutating operation
/// is a saga: ordered steps, each registering the action that undoes it.
/// An operation either commits, is fully compensated, or fails with
/// `PartialFailure` when a compensation could not be applied.
pub struct DocumentService<S, C, L>
where
    S: DocumentStore,
    C: CatalogStore,
    L: InventoryLedger,
{
    store: S,
    catalog: C,
    ledger: L,
    config: ServiceConfig,
}

impl<S, C, L> DocumentService<S, C, L>
where
    S: DocumentStore,
    C: CatalogStore,
    L: InventoryLedger,
{
    /// Creates a new document service.
    pub fn new(store: S, catalog: C, ledger: L, config: ServiceConfig) -> Self {
        Self {
            store,
            catalog,
            ledger,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Creates a document with its lines.
    ///
    /// A document created as completed records its stock movement. If the
    /// ledger refuses, the document is kept with status pending and the
    /// ledger error is returned.
    #[tracing::instrument(skip(self, header, items), fields(operation = OP_CREATE))]
    pub async fn create(
        &self,
        kind: DocumentKind,
        header: DocumentHeader,
        items: Vec<NewDocumentItem>,
    ) -> Result<Document> {
        observed(OP_CREATE, kind, self.run_create(kind, header, items)).await
    }

    /// Replaces a document's header and its whole set of lines.
    ///
    /// The status cannot change here. The header write is not rolled back if
    /// replacing the lines fails afterwards; the previous lines are restored
    /// and the caller must retry.
    #[tracing::instrument(skip(self, header, items), fields(operation = OP_UPDATE))]
    pub async fn update(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        header: DocumentHeader,
        items: Vec<NewDocumentItem>,
        expected_version: Option<Version>,
    ) -> Result<Document> {
        observed(
            OP_UPDATE,
            kind,
            self.run_update(kind, id, header, items, expected_version),
        )
        .await
    }

    /// Moves a document to `status`.
    ///
    /// Entering completed records the stock movement; leaving it reverses
    /// the movement first. Requesting the current status is a no-op.
    #[tracing::instrument(skip(self), fields(operation = OP_CHANGE_STATUS))]
    pub async fn change_status(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        status: DocumentStatus,
    ) -> Result<Document> {
        observed(
            OP_CHANGE_STATUS,
            kind,
            self.run_change_status(kind, id, status),
        )
        .await
    }

    /// Deletes a document and its lines.
    ///
    /// A completed document has its movements reversed first; if that fails
    /// the document is left untouched.
    #[tracing::instrument(skip(self), fields(operation = OP_DELETE))]
    pub async fn delete(&self, kind: DocumentKind, id: DocumentId) -> Result<()> {
        observed(OP_DELETE, kind, self.run_delete(kind, id)).await
    }

    async fn run_create(
        &self,
        kind: DocumentKind,
        header: DocumentHeader,
        items: Vec<NewDocumentItem>,
    ) -> Result<Document> {
        let totals = validate_document(&header, &items)?.rounded();
        let items = self.resolve_items(items).await?;
        let code = match &header.code {
            Some(code) => code.trim().to_string(),
            None => generate_code(kind, header.date),
        };
        let status = header.status;
        let new_document = NewDocument {
            business_id: header.business_id,
            status,
            fields: header_fields(&header, code, &totals),
        };
        let lines: Vec<StockLine> = items.iter().map(StockLine::from).collect();

        let mut saga = SagaInstance::start(OP_CREATE, kind, None);

        // Step 1: header
        let document = self
            .store_call(self.store.insert_document(kind, new_document))
            .await
            .map_err(|e| DocumentError::from_store(STEP_INSERT_HEADER, None, e))?;
        saga.set_document(document.id);
        saga.step_completed(STEP_INSERT_HEADER, Some(Compensation::DeleteDocument));

        // Step 2: lines
        saga.push_compensation(Compensation::DeleteItems);
        if let Err(e) = self
            .store_call(self.store.insert_items(kind, document.id, items))
            .await
        {
            let error = DocumentError::from_store(STEP_INSERT_ITEMS, Some(document.id), e);
            return Err(self.compensate(&mut saga, STEP_INSERT_ITEMS, error).await);
        }
        saga.step_completed(STEP_INSERT_ITEMS, None);

        // Step 3: stock movement. The user's input is kept from here on.
        if status.carries_stock_effect() {
            saga.pivot();
            saga.push_compensation(Compensation::RestoreStatus {
                status: DocumentStatus::Pending,
                version: document.version,
            });
            if let Err(e) = self
                .ledger_call(self.ledger.apply_movement(
                    document.id,
                    MovementKind::for_document(kind),
                    lines,
                ))
                .await
            {
                let error = DocumentError::Ledger {
                    step: STEP_APPLY_MOVEMENT,
                    document_id: document.id,
                    source: e,
                };
                return Err(self.compensate(&mut saga, STEP_APPLY_MOVEMENT, error).await);
            }
            saga.step_completed(STEP_APPLY_MOVEMENT, None);
        }

        saga.commit();
        tracing::info!(document_id = %document.id, code = %document.code, %status, "document created");
        Ok(document)
    }

    async fn run_update(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        header: DocumentHeader,
        items: Vec<NewDocumentItem>,
        expected_version: Option<Version>,
    ) -> Result<Document> {
        let totals = validate_document(&header, &items)?.rounded();
        let (current, previous_items) = self.load_with_items(kind, id).await?;

        if let Some(expected) = expected_version
            && expected != current.version
        {
            return Err(DocumentError::Conflict {
                document_id: id,
                expected,
                actual: current.version,
            });
        }
        if header.status != current.status {
            return Err(ValidationError::StatusChangeViaUpdate {
                stored: current.status,
                requested: header.status,
            }
            .into());
        }

        let items = self.resolve_items(items).await?;
        if current.status.carries_stock_effect() {
            tracing::warn!(
                document_id = %id,
                "updating a completed document; its stock movement still reflects the previous lines"
            );
        }

        let code = match &header.code {
            Some(code) => code.trim().to_string(),
            None => current.code.clone(),
        };
        let fields = header_fields(&header, code, &totals);

        let mut saga = SagaInstance::start(OP_UPDATE, kind, Some(id));

        // Step 1: header
        let document = self
            .store_call(self.store.update_document(
                kind,
                id,
                fields,
                UpdateOptions::expect_version(current.version),
            ))
            .await
            .map_err(|e| DocumentError::from_store(STEP_UPDATE_HEADER, Some(id), e))?;
        saga.step_completed(STEP_UPDATE_HEADER, None);

        // Step 2: drop the previous lines
        if let Err(e) = self.store_call(self.store.delete_items(kind, id)).await {
            let error = DocumentError::from_store(STEP_DELETE_ITEMS, Some(id), e);
            return Err(self.compensate(&mut saga, STEP_DELETE_ITEMS, error).await);
        }
        saga.step_completed(
            STEP_DELETE_ITEMS,
            Some(Compensation::RestoreItems(
                previous_items.iter().map(DocumentItem::to_new).collect(),
            )),
        );

        // Step 3: insert the new lines
        saga.push_compensation(Compensation::DeleteItems);
        if let Err(e) = self
            .store_call(self.store.insert_items(kind, id, items))
            .await
        {
            let error = DocumentError::from_store(STEP_INSERT_ITEMS, Some(id), e);
            return Err(self.compensate(&mut saga, STEP_INSERT_ITEMS, error).await);
        }
        saga.step_completed(STEP_INSERT_ITEMS, None);

        saga.commit();
        tracing::info!(document_id = %id, version = %document.version, "document updated");
        Ok(document)
    }

    async fn run_change_status(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        status: DocumentStatus,
    ) -> Result<Document> {
        let current = self.load(kind, id).await?;

        if current.status == status {
            tracing::debug!(document_id = %id, %status, "status unchanged");
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(ValidationError::InvalidTransition {
                from: current.status,
                to: status,
            }
            .into());
        }

        let movement = MovementKind::for_document(kind);
        let options = UpdateOptions::expect_version(current.version);
        let mut saga = SagaInstance::start(OP_CHANGE_STATUS, kind, Some(id));

        let document = if status.carries_stock_effect() {
            let lines = self.load_stock_lines(kind, id).await?;

            let document = self
                .store_call(self.store.set_status(kind, id, status, options))
                .await
                .map_err(|e| DocumentError::from_store(STEP_SET_STATUS, Some(id), e))?;
            saga.step_completed(
                STEP_SET_STATUS,
                Some(Compensation::RestoreStatus {
                    status: current.status,
                    version: document.version,
                }),
            );

            if let Err(e) = self
                .ledger_call(self.ledger.apply_movement(id, movement, lines))
                .await
            {
                let error = DocumentError::Ledger {
                    step: STEP_APPLY_MOVEMENT,
                    document_id: id,
                    source: e,
                };
                return Err(self.compensate(&mut saga, STEP_APPLY_MOVEMENT, error).await);
            }
            saga.step_completed(STEP_APPLY_MOVEMENT, None);
            document
        } else if current.status.carries_stock_effect() {
            let lines = self.load_stock_lines(kind, id).await?;

            self.ledger_call(self.ledger.reverse_movements(id))
                .await
                .map_err(|e| DocumentError::Ledger {
                    step: STEP_REVERSE_MOVEMENTS,
                    document_id: id,
                    source: e,
                })?;
            saga.step_completed(
                STEP_REVERSE_MOVEMENTS,
                Some(Compensation::ReapplyMovement {
                    kind: movement,
                    lines,
                }),
            );

            let document = match self
                .store_call(self.store.set_status(kind, id, status, options))
                .await
            {
                Ok(document) => document,
                Err(e) => {
                    let error = DocumentError::from_store(STEP_SET_STATUS, Some(id), e);
                    return Err(self.compensate(&mut saga, STEP_SET_STATUS, error).await);
                }
            };
            saga.step_completed(STEP_SET_STATUS, None);
            document
        } else {
            let document = self
                .store_call(self.store.set_status(kind, id, status, options))
                .await
                .map_err(|e| DocumentError::from_store(STEP_SET_STATUS, Some(id), e))?;
            saga.step_completed(STEP_SET_STATUS, None);
            document
        };

        saga.commit();
        tracing::info!(document_id = %id, from = %current.status, to = %status, "document status changed");
        Ok(document)
    }

    async fn run_delete(&self, kind: DocumentKind, id: DocumentId) -> Result<()> {
        let (current, items) = self.load_with_items(kind, id).await?;
        let mut saga = SagaInstance::start(OP_DELETE, kind, Some(id));

        // Step 1: undo the stock effect; nothing is touched if this fails
        if current.status.carries_stock_effect() {
            self.ledger_call(self.ledger.reverse_movements(id))
                .await
                .map_err(|e| DocumentError::Ledger {
                    step: STEP_REVERSE_MOVEMENTS,
                    document_id: id,
                    source: e,
                })?;
            saga.step_completed(
                STEP_REVERSE_MOVEMENTS,
                Some(Compensation::ReapplyMovement {
                    kind: MovementKind::for_document(kind),
                    lines: items.iter().map(StockLine::from).collect(),
                }),
            );
        }

        // Step 2: lines
        if let Err(e) = self.store_call(self.store.delete_items(kind, id)).await {
            let error = DocumentError::from_store(STEP_DELETE_ITEMS, Some(id), e);
            return Err(self.compensate(&mut saga, STEP_DELETE_ITEMS, error).await);
        }
        saga.step_completed(
            STEP_DELETE_ITEMS,
            Some(Compensation::RestoreItems(
                items.iter().map(DocumentItem::to_new).collect(),
            )),
        );

        // Step 3: header
        if let Err(e) = self.store_call(self.store.delete_document(kind, id)).await {
            let error = DocumentError::from_store(STEP_DELETE_HEADER, Some(id), e);
            return Err(self.compensate(&mut saga, STEP_DELETE_HEADER, error).await);
        }
        saga.step_completed(STEP_DELETE_HEADER, None);

        saga.commit();
        tracing::info!(document_id = %id, code = %current.code, "document deleted");
        Ok(())
    }

    /// Runs the saga's compensations in reverse order and builds the error
    /// to return.
    ///
    /// Compensations keep running after one fails. Any failure turns the
    /// result into `PartialFailure`.
    async fn compensate(
        &self,
        saga: &mut SagaInstance,
        step: &'static str,
        error: DocumentError,
    ) -> DocumentError {
        tracing::warn!(
            operation = saga.operation(),
            step,
            completed = ?saga.completed_steps(),
            pending = saga.pending_compensations().len(),
            error = %error,
            "saga step failed, compensating"
        );
        let compensations = saga.fail(step, error.to_string());

        if let Some(document_id) = saga.document_id() {
            for compensation in compensations {
                metrics::counter!("document_compensations_total", "compensation" => compensation.name())
                    .increment(1);
                match self.run_compensation(saga.kind(), document_id, &compensation).await {
                    Ok(()) => {
                        tracing::info!(%document_id, compensation = compensation.name(), "compensation applied");
                    }
                    Err(e) => {
                        tracing::error!(
                            %document_id,
                            compensation = compensation.name(),
                            error = %e,
                            "compensation failed"
                        );
                        saga.compensation_failed(&compensation, e);
                    }
                }
            }
        }

        saga.finish_compensation();
        match (saga.state(), saga.document_id(), saga.failed_step()) {
            (SagaState::NeedsReconciliation, Some(document_id), Some(failed_step)) => {
                tracing::error!(
                    operation = saga.operation(),
                    %document_id,
                    step = failed_step,
                    failed_compensations = saga.failed_compensations().len(),
                    "document needs manual reconciliation"
                );
                DocumentError::PartialFailure {
                    step: failed_step,
                    document_id,
                    reason: saga.failure_reason().unwrap_or_default().to_string(),
                    failed_compensations: saga.take_failed_compensations(),
                }
            }
            _ => error,
        }
    }

    async fn run_compensation(
        &self,
        kind: DocumentKind,
        document_id: DocumentId,
        compensation: &Compensation,
    ) -> std::result::Result<(), String> {
        match compensation {
            Compensation::DeleteDocument => self
                .store_call(self.store.delete_document(kind, document_id))
                .await
                .map_err(|e| e.to_string()),
            Compensation::DeleteItems => self
                .store_call(self.store.delete_items(kind, document_id))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Compensation::RestoreItems(items) => self
                .store_call(self.store.insert_items(kind, document_id, items.clone()))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Compensation::RestoreStatus { status, version } => self
                .store_call(self.store.set_status(
                    kind,
                    document_id,
                    *status,
                    UpdateOptions::expect_version(*version),
                ))
                .await
                .map(|_| ())
                .map_err(|e| e.to_string()),
            Compensation::ReapplyMovement { kind, lines } => self
                .ledger_call(self.ledger.apply_movement(document_id, *kind, lines.clone()))
                .await
                .map_err(|e| e.to_string()),
        }
    }

    async fn load(&self, kind: DocumentKind, id: DocumentId) -> Result<Document> {
        self.store_call(self.store.get_document(kind, id))
            .await
            .map_err(|e| DocumentError::from_store(STEP_LOAD_DOCUMENT, Some(id), e))?
            .ok_or_else(|| DocumentError::document_not_found(id))
    }

    async fn load_with_items(
        &self,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<(Document, Vec<DocumentItem>)> {
        let (document, items) = futures_util::try_join!(
            self.store_call(self.store.get_document(kind, id)),
            self.store_call(self.store.get_items(kind, id)),
        )
        .map_err(|e| DocumentError::from_store(STEP_LOAD_DOCUMENT, Some(id), e))?;
        let document = document.ok_or_else(|| DocumentError::document_not_found(id))?;
        Ok((document, items))
    }

    async fn load_stock_lines(&self, kind: DocumentKind, id: DocumentId) -> Result<Vec<StockLine>> {
        let items = self
            .store_call(self.store.get_items(kind, id))
            .await
            .map_err(|e| DocumentError::from_store(STEP_LOAD_ITEMS, Some(id), e))?;
        Ok(items.iter().map(StockLine::from).collect())
    }

    /// Checks every line against the catalog and freezes the current names
    /// onto lines that don't carry one.
    async fn resolve_items(&self, items: Vec<NewDocumentItem>) -> Result<Vec<NewDocumentItem>> {
        try_join_all(items.into_iter().map(|item| self.resolve_item(item))).await
    }

    async fn resolve_item(&self, mut item: NewDocumentItem) -> Result<NewDocumentItem> {
        let (product, variant) = futures_util::try_join!(
            self.store_call(self.catalog.get_product(item.product_id)),
            self.lookup_variant(item.variant_id),
        )
        .map_err(|e| DocumentError::from_store(STEP_LOAD_CATALOG, None, e))?;

        let product = product.ok_or_else(|| DocumentError::NotFound {
            entity: "product",
            id: item.product_id.to_string(),
        })?;
        freeze_product(&mut item, &product);

        if let Some(variant_id) = item.variant_id {
            let variant = variant.ok_or_else(|| DocumentError::NotFound {
                entity: "variant",
                id: variant_id.to_string(),
            })?;
            if variant.product_id != item.product_id {
                return Err(ValidationError::VariantProductMismatch {
                    variant_id,
                    product_id: item.product_id,
                }
                .into());
            }
            freeze_variant(&mut item, &variant);
        }

        Ok(item)
    }

    async fn lookup_variant(
        &self,
        variant_id: Option<VariantId>,
    ) -> store::Result<Option<Variant>> {
        match variant_id {
            Some(id) => self.store_call(self.catalog.get_variant(id)).await,
            None => Ok(None),
        }
    }

    async fn store_call<T, F>(&self, call: F) -> store::Result<T>
    where
        F: Future<Output = store::Result<T>>,
    {
        tokio::time::timeout(self.config.step_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout(self.config.step_timeout)))
    }

    async fn ledger_call<F>(&self, call: F) -> std::result::Result<(), LedgerError>
    where
        F: Future<Output = std::result::Result<(), LedgerError>>,
    {
        tokio::time::timeout(self.config.step_timeout, call)
            .await
            .unwrap_or(Err(LedgerError::Timeout(self.config.step_timeout)))
    }
}

/// Records duration and outcome metrics around one operation.
async fn observed<T, F>(operation: &'static str, kind: DocumentKind, run: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    metrics::counter!("document_operations_total", "operation" => operation, "kind" => kind.as_str())
        .increment(1);
    let started = Instant::now();

    let result = run.await;

    metrics::histogram!("document_operation_duration_seconds", "operation" => operation)
        .record(started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        metrics::counter!(
            "document_operations_failed_total",
            "operation" => operation,
            "kind" => kind.as_str(),
            "error" => e.label()
        )
        .increment(1);
        if e.needs_reconciliation() {
            metrics::counter!("document_reconciliation_required_total", "operation" => operation)
                .increment(1);
        }
    }
    result
}

fn header_fields(header: &DocumentHeader, code: String, totals: &Totals) -> DocumentFields {
    DocumentFields {
        code,
        counterparty_id: header.counterparty_id,
        date: header.date,
        payment_status: header.payment_status,
        subtotal: totals.subtotal,
        discount: totals.header_discount,
        tax_rate: header.tax_rate,
        tax_amount: totals.tax_amount,
        total_amount: totals.total,
        notes: header.notes.clone(),
    }
}

/// Builds a code such as `SAL-20240301-1A2B3C4D`.
fn generate_code(kind: DocumentKind, date: NaiveDate) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        kind.code_prefix(),
        date.format("%Y%m%d"),
        suffix[..8].to_uppercase()
    )
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

fn freeze_product(item: &mut NewDocumentItem, product: &Product) {
    if is_blank(&item.original_product_name) {
        item.original_product_name = Some(product.name.clone());
    }
    if item.bar_code.is_none() {
        item.bar_code = product.bar_code.clone();
    }
}

fn freeze_variant(item: &mut NewDocumentItem, variant: &Variant) {
    if is_blank(&item.original_variant_name) {
        item.original_variant_name = Some(variant.name.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use common::{BusinessId, ProductId};
    use domain::{Attribute, AttributeType, Money};
    use store::{FailPoint, InMemoryCatalog, InMemoryDocumentStore};

    use crate::services::InMemoryInventoryLedger;

    type Service = DocumentService<InMemoryDocumentStore, InMemoryCatalog, InMemoryInventoryLedger>;

    struct Fixture {
        service: Service,
        store: InMemoryDocumentStore,
        catalog: InMemoryCatalog,
        ledger: InMemoryInventoryLedger,
        product_id: ProductId,
        variant_id: VariantId,
    }

    async fn setup() -> Fixture {
        let store = InMemoryDocumentStore::new();
        let catalog = InMemoryCatalog::new();
        let ledger = InMemoryInventoryLedger::new();

        let product_id = ProductId::new();
        let variant_id = VariantId::new();
        catalog
            .insert_product(Product::new(product_id, "Acme Widget"))
            .await;
        catalog
            .insert_variant(
                Variant::new(variant_id, product_id, "Red"),
                vec![Attribute::new(AttributeType::Color, "red")],
            )
            .await;

        let service = DocumentService::new(
            store.clone(),
            catalog.clone(),
            ledger.clone(),
            ServiceConfig::default(),
        );
        Fixture {
            service,
            store,
            catalog,
            ledger,
            product_id,
            variant_id,
        }
    }

    fn header(status: DocumentStatus) -> DocumentHeader {
        DocumentHeader::new(BusinessId::new(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .with_status(status)
    }

    fn items(f: &Fixture) -> Vec<NewDocumentItem> {
        vec![
            NewDocumentItem::new(f.product_id, 2, Money::from_major(10)),
            NewDocumentItem::new(f.product_id, 1, Money::from_major(5))
                .with_variant(f.variant_id)
                .with_discount(Money::from_major(1)),
        ]
    }

    #[tokio::test]
    async fn test_create_draft_has_no_stock_effect() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await
            .unwrap();

        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.subtotal, Money::from_major(24));
        assert!(doc.code.starts_with("SAL-20240301-"));
        assert_eq!(f.store.item_count(doc.id).await, 2);
        assert_eq!(f.ledger.movement_count(doc.id).await, 0);
    }

    #[tokio::test]
    async fn test_create_freezes_catalog_names() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Purchase, header(DocumentStatus::Draft), items(&f))
            .await
            .unwrap();

        let stored = f.store.get_items(DocumentKind::Purchase, doc.id).await.unwrap();
        assert_eq!(stored[0].original_product_name.as_deref(), Some("Acme Widget"));
        assert_eq!(stored[1].original_variant_name.as_deref(), Some("Red"));
    }

    #[tokio::test]
    async fn test_create_completed_records_one_movement() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Purchase, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();

        assert_eq!(f.ledger.movement_count(doc.id).await, 1);
        assert_eq!(f.ledger.stock_level(f.product_id, None).await, 2);
        assert_eq!(f.ledger.stock_level(f.product_id, Some(f.variant_id)).await, 1);
    }

    #[tokio::test]
    async fn test_create_unknown_product_is_not_found() {
        let f = setup().await;
        let result = f
            .service
            .create(
                DocumentKind::Sale,
                header(DocumentStatus::Draft),
                vec![NewDocumentItem::new(ProductId::new(), 1, Money::from_major(1))],
            )
            .await;

        assert!(matches!(result, Err(DocumentError::NotFound { entity: "product", .. })));
        assert_eq!(f.store.document_count(DocumentKind::Sale).await, 0);
    }

    #[tokio::test]
    async fn test_create_variant_of_other_product_rejected() {
        let f = setup().await;
        let other = ProductId::new();
        f.catalog.insert_product(Product::new(other, "Gadget")).await;

        let result = f
            .service
            .create(
                DocumentKind::Sale,
                header(DocumentStatus::Draft),
                vec![NewDocumentItem::new(other, 1, Money::from_major(1)).with_variant(f.variant_id)],
            )
            .await;

        assert!(matches!(
            result,
            Err(DocumentError::Validation(ValidationError::VariantProductMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_create_item_failure_removes_header() {
        let f = setup().await;
        f.store.set_fail_on(FailPoint::InsertItems, true).await;

        let result = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await;

        assert!(matches!(
            result,
            Err(DocumentError::Persistence { step: STEP_INSERT_ITEMS, .. })
        ));
        assert_eq!(f.store.document_count(DocumentKind::Sale).await, 0);
    }

    #[tokio::test]
    async fn test_create_item_failure_with_failed_cleanup_is_partial() {
        let f = setup().await;
        f.store.set_fail_on(FailPoint::InsertItems, true).await;
        f.store.set_fail_on(FailPoint::DeleteDocument, true).await;

        let result = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await;

        match result {
            Err(DocumentError::PartialFailure {
                step,
                failed_compensations,
                ..
            }) => {
                assert_eq!(step, STEP_INSERT_ITEMS);
                assert_eq!(failed_compensations.len(), 1);
                assert_eq!(failed_compensations[0].compensation, "delete_document");
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(f.store.document_count(DocumentKind::Sale).await, 1);
    }

    #[tokio::test]
    async fn test_create_ledger_failure_keeps_document_pending() {
        let f = setup().await;
        f.ledger.set_fail_on_apply(true).await;

        let result = f
            .service
            .create(DocumentKind::Purchase, header(DocumentStatus::Completed), items(&f))
            .await;

        let document_id = match result {
            Err(DocumentError::Ledger {
                step: STEP_APPLY_MOVEMENT,
                document_id,
                ..
            }) => document_id,
            other => panic!("expected ledger error, got {other:?}"),
        };
        let stored = f
            .store
            .get_document(DocumentKind::Purchase, document_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DocumentStatus::Pending);
        assert_eq!(f.store.item_count(document_id).await, 2);
        assert_eq!(f.ledger.movement_count(document_id).await, 0);
    }

    #[tokio::test]
    async fn test_change_status_to_same_status_is_noop() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();

        let unchanged = f
            .service
            .change_status(DocumentKind::Sale, doc.id, DocumentStatus::Completed)
            .await
            .unwrap();

        assert_eq!(unchanged.version, doc.version);
        assert_eq!(f.ledger.apply_calls().await, 1);
    }

    #[tokio::test]
    async fn test_change_status_rejects_leaving_cancelled() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Cancelled), items(&f))
            .await
            .unwrap();

        let result = f
            .service
            .change_status(DocumentKind::Sale, doc.id, DocumentStatus::Draft)
            .await;
        assert!(matches!(
            result,
            Err(DocumentError::Validation(ValidationError::InvalidTransition { .. }))
        ));
    }

    #[tokio::test]
    async fn test_change_status_ledger_failure_restores_status() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Pending), items(&f))
            .await
            .unwrap();
        f.ledger.set_fail_on_apply(true).await;

        let result = f
            .service
            .change_status(DocumentKind::Sale, doc.id, DocumentStatus::Completed)
            .await;

        assert!(matches!(result, Err(DocumentError::Ledger { .. })));
        let stored = f.store.get_document(DocumentKind::Sale, doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Pending);
    }

    #[tokio::test]
    async fn test_downgrade_reverses_movement() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Purchase, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();

        f.service
            .change_status(DocumentKind::Purchase, doc.id, DocumentStatus::Pending)
            .await
            .unwrap();

        assert_eq!(f.ledger.movement_count(doc.id).await, 0);
        assert_eq!(f.ledger.stock_level(f.product_id, None).await, 0);
    }

    #[tokio::test]
    async fn test_downgrade_status_write_failure_reapplies_movement() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Purchase, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();
        f.store.set_fail_on(FailPoint::SetStatus, true).await;

        let result = f
            .service
            .change_status(DocumentKind::Purchase, doc.id, DocumentStatus::Draft)
            .await;

        assert!(matches!(
            result,
            Err(DocumentError::Persistence { step: STEP_SET_STATUS, .. })
        ));
        assert_eq!(f.ledger.movement_count(doc.id).await, 1);
        let stored = f.store.get_document(DocumentKind::Purchase, doc.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DocumentStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_rejects_status_change() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await
            .unwrap();

        let result = f
            .service
            .update(
                DocumentKind::Sale,
                doc.id,
                header(DocumentStatus::Completed),
                items(&f),
                None,
            )
            .await;
        assert!(matches!(
            result,
            Err(DocumentError::Validation(ValidationError::StatusChangeViaUpdate { .. }))
        ));
        assert_eq!(f.ledger.apply_calls().await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_lines() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await
            .unwrap();

        let updated = f
            .service
            .update(
                DocumentKind::Sale,
                doc.id,
                header(DocumentStatus::Draft).with_notes("reworked"),
                vec![NewDocumentItem::new(f.product_id, 3, Money::from_major(4))],
                Some(doc.version),
            )
            .await
            .unwrap();

        assert_eq!(updated.version, doc.version.bumped());
        assert_eq!(updated.code, doc.code);
        assert_eq!(updated.total_amount, Money::from_major(12));
        assert_eq!(f.store.item_count(doc.id).await, 1);
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await
            .unwrap();
        f.service
            .update(DocumentKind::Sale, doc.id, header(DocumentStatus::Draft), items(&f), None)
            .await
            .unwrap();

        let result = f
            .service
            .update(
                DocumentKind::Sale,
                doc.id,
                header(DocumentStatus::Draft),
                items(&f),
                Some(doc.version),
            )
            .await;
        assert!(matches!(result, Err(DocumentError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_update_insert_failure_restores_previous_lines() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await
            .unwrap();
        f.store.fail_once_on(FailPoint::InsertItems).await;

        let result = f
            .service
            .update(
                DocumentKind::Sale,
                doc.id,
                header(DocumentStatus::Draft).with_notes("new"),
                vec![NewDocumentItem::new(f.product_id, 9, Money::from_major(1))],
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(DocumentError::Persistence { step: STEP_INSERT_ITEMS, .. })
        ));
        // Header stays updated, lines are the previous ones
        let stored = f.store.get_document(DocumentKind::Sale, doc.id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("new"));
        let lines = f.store.get_items(DocumentKind::Sale, doc.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_update_lost_lines_is_partial_failure() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Draft), items(&f))
            .await
            .unwrap();
        f.store.set_fail_on(FailPoint::InsertItems, true).await;

        let result = f
            .service
            .update(DocumentKind::Sale, doc.id, header(DocumentStatus::Draft), items(&f), None)
            .await;

        match result {
            Err(e @ DocumentError::PartialFailure { .. }) => assert!(e.needs_reconciliation()),
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(f.store.item_count(doc.id).await, 0);
    }

    #[tokio::test]
    async fn test_delete_completed_reverses_then_deletes() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();

        f.service.delete(DocumentKind::Sale, doc.id).await.unwrap();

        assert_eq!(f.store.document_count(DocumentKind::Sale).await, 0);
        assert_eq!(f.store.item_count(doc.id).await, 0);
        assert_eq!(f.ledger.movement_count(doc.id).await, 0);
    }

    #[tokio::test]
    async fn test_delete_aborts_when_reversal_fails() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();
        f.ledger.set_fail_on_reverse(true).await;

        let result = f.service.delete(DocumentKind::Sale, doc.id).await;

        assert!(matches!(
            result,
            Err(DocumentError::Ledger { step: STEP_REVERSE_MOVEMENTS, .. })
        ));
        let stored = f.store.get_document(DocumentKind::Sale, doc.id).await.unwrap().unwrap();
        assert_eq!(stored, doc);
        assert_eq!(f.store.item_count(doc.id).await, 2);
        assert_eq!(f.ledger.movement_count(doc.id).await, 1);
    }

    #[tokio::test]
    async fn test_delete_header_failure_restores_items_and_movement() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Sale, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();
        f.store.set_fail_on(FailPoint::DeleteDocument, true).await;

        let result = f.service.delete(DocumentKind::Sale, doc.id).await;

        assert!(matches!(
            result,
            Err(DocumentError::Persistence { step: STEP_DELETE_HEADER, .. })
        ));
        assert_eq!(f.store.item_count(doc.id).await, 2);
        assert_eq!(f.ledger.movement_count(doc.id).await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_document_is_not_found() {
        let f = setup().await;
        let result = f.service.delete(DocumentKind::Sale, DocumentId::new()).await;
        assert!(matches!(result, Err(DocumentError::NotFound { entity: "document", .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ledger_timeout_is_a_step_failure() {
        let f = setup().await;
        let service = DocumentService::new(
            f.store.clone(),
            f.catalog.clone(),
            f.ledger.clone(),
            ServiceConfig::default().with_step_timeout(Duration::from_millis(100)),
        );
        f.ledger.set_delay(Duration::from_secs(10)).await;

        let result = service
            .create(DocumentKind::Purchase, header(DocumentStatus::Completed), items(&f))
            .await;

        match result {
            Err(DocumentError::Ledger {
                source: LedgerError::Timeout(_),
                document_id,
                ..
            }) => {
                let stored = f
                    .store
                    .get_document(DocumentKind::Purchase, document_id)
                    .await
                    .unwrap()
                    .unwrap();
                assert_eq!(stored.status, DocumentStatus::Pending);
            }
            other => panic!("expected ledger timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_on_lines_removes_header() {
        let f = setup().await;
        let service = DocumentService::new(
            f.store.clone(),
            f.catalog.clone(),
            f.ledger.clone(),
            ServiceConfig::default().with_step_timeout(Duration::from_millis(100)),
        );
        f.store
            .set_delay_on(FailPoint::InsertItems, Duration::from_secs(10))
            .await;

        let result = service
            .create(DocumentKind::Purchase, header(DocumentStatus::Draft), items(&f))
            .await;

        assert!(matches!(
            result,
            Err(DocumentError::Persistence {
                step: STEP_INSERT_ITEMS,
                source: StoreError::Timeout(_),
                ..
            })
        ));
        assert_eq!(f.store.document_count(DocumentKind::Purchase).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_timeout_after_reversal_reapplies_movement() {
        let f = setup().await;
        let service = DocumentService::new(
            f.store.clone(),
            f.catalog.clone(),
            f.ledger.clone(),
            ServiceConfig::default().with_step_timeout(Duration::from_millis(100)),
        );
        let doc = service
            .create(DocumentKind::Purchase, header(DocumentStatus::Completed), items(&f))
            .await
            .unwrap();
        f.store
            .set_delay_on(FailPoint::SetStatus, Duration::from_secs(10))
            .await;

        let result = service
            .change_status(DocumentKind::Purchase, doc.id, DocumentStatus::Pending)
            .await;

        assert!(matches!(
            result,
            Err(DocumentError::Persistence {
                step: STEP_SET_STATUS,
                source: StoreError::Timeout(_),
                ..
            })
        ));
        let stored = f
            .store
            .get_document(DocumentKind::Purchase, doc.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DocumentStatus::Completed);
        assert_eq!(stored.version, doc.version);
        assert_eq!(f.ledger.movement_count(doc.id).await, 1);
        assert_eq!(f.ledger.stock_level(f.product_id, None).await, 2);
        assert_eq!(f.ledger.stock_level(f.product_id, Some(f.variant_id)).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_restore_yields_to_concurrent_writer() {
        let f = setup().await;
        let doc = f
            .service
            .create(DocumentKind::Purchase, header(DocumentStatus::Pending), items(&f))
            .await
            .unwrap();
        f.ledger.set_delay(Duration::from_secs(1)).await;
        f.ledger.set_fail_on_apply(true).await;

        let concurrent = async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            f.store
                .set_status(
                    DocumentKind::Purchase,
                    doc.id,
                    DocumentStatus::Cancelled,
                    UpdateOptions::default(),
                )
                .await
                .unwrap()
        };
        let (result, _) = tokio::join!(
            f.service
                .change_status(DocumentKind::Purchase, doc.id, DocumentStatus::Completed),
            concurrent
        );

        match result {
            Err(DocumentError::PartialFailure {
                step,
                failed_compensations,
                ..
            }) => {
                assert_eq!(step, STEP_APPLY_MOVEMENT);
                assert_eq!(failed_compensations.len(), 1);
                assert_eq!(failed_compensations[0].compensation, "restore_status");
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        let stored = f
            .store
            .get_document(DocumentKind::Purchase, doc.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DocumentStatus::Cancelled);
        assert_eq!(f.ledger.movement_count(doc.id).await, 0);
    }

    #[test]
    fn test_generate_code_format() {
        let code = generate_code(DocumentKind::Purchase, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
        assert!(code.starts_with("PUR-20241231-"));
        assert_eq!(code.len(), "PUR-20241231-".len() + 8);
    }
}
