//! Inventory ledger trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{DocumentId, ProductId, VariantId};
use domain::{DocumentItem, DocumentKind, NewDocumentItem};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock comes in (completed purchase).
    Entry,
    /// Stock goes out (completed sale).
    Deduction,
}

impl MovementKind {
    /// Returns the movement a completed document of `kind` records.
    pub fn for_document(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::Purchase => MovementKind::Entry,
            DocumentKind::Sale => MovementKind::Deduction,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entry => "entry",
            MovementKind::Deduction => "deduction",
        }
    }

    fn signed(&self, quantity: u32) -> i64 {
        match self {
            MovementKind::Entry => i64::from(quantity),
            MovementKind::Deduction => -i64::from(quantity),
        }
    }
}

impl std::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product quantity moved by a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
}

impl From<&DocumentItem> for StockLine {
    fn from(item: &DocumentItem) -> Self {
        Self {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
        }
    }
}

impl From<&NewDocumentItem> for StockLine {
    fn from(item: &NewDocumentItem) -> Self {
        Self {
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
        }
    }
}

/// Errors reported by the inventory ledger.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger rejected the movement: {0}")]
    Rejected(String),

    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Ledger call timed out after {0:?}")]
    Timeout(Duration),
}

/// Records stock movements tied to documents.
///
/// `apply_movement` is not idempotent; calling it twice for the same
/// document records two movements.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Records an entry or deduction for the document's lines.
    async fn apply_movement(
        &self,
        document_id: DocumentId,
        kind: MovementKind,
        lines: Vec<StockLine>,
    ) -> Result<(), LedgerError>;

    /// Undoes every movement recorded for the document.
    async fn reverse_movements(&self, document_id: DocumentId) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone)]
struct Movement {
    kind: MovementKind,
    lines: Vec<StockLine>,
}

#[derive(Debug, Default)]
struct InMemoryLedgerState {
    movements: HashMap<DocumentId, Vec<Movement>>,
    stock: HashMap<(ProductId, Option<VariantId>), i64>,
    apply_calls: usize,
    fail_on_apply: bool,
    fail_on_reverse: bool,
    delay: Option<Duration>,
}

impl InMemoryLedgerState {
    fn adjust(&mut self, movement: &Movement, sign: i64) {
        for line in &movement.lines {
            *self
                .stock
                .entry((line.product_id, line.variant_id))
                .or_default() += sign * movement.kind.signed(line.quantity);
        }
    }
}

/// In-memory inventory ledger for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryLedger {
    state: Arc<RwLock<InMemoryLedgerState>>,
}

impl InMemoryInventoryLedger {
    /// Creates a new in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the ledger to fail on apply calls.
    pub async fn set_fail_on_apply(&self, fail: bool) {
        self.state.write().await.fail_on_apply = fail;
    }

    /// Configures the ledger to fail on reverse calls.
    pub async fn set_fail_on_reverse(&self, fail: bool) {
        self.state.write().await.fail_on_reverse = fail;
    }

    /// Delays every call by `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        self.state.write().await.delay = Some(delay);
    }

    /// Returns the number of movements currently recorded for a document.
    pub async fn movement_count(&self, document_id: DocumentId) -> usize {
        self.state
            .read()
            .await
            .movements
            .get(&document_id)
            .map_or(0, Vec::len)
    }

    /// Returns the net stock of a product or variant.
    pub async fn stock_level(&self, product_id: ProductId, variant_id: Option<VariantId>) -> i64 {
        self.state
            .read()
            .await
            .stock
            .get(&(product_id, variant_id))
            .copied()
            .unwrap_or(0)
    }

    /// Returns how many times `apply_movement` was called, failed calls included.
    pub async fn apply_calls(&self) -> usize {
        self.state.read().await.apply_calls
    }

    async fn wait(&self) {
        let delay = self.state.read().await.delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn apply_movement(
        &self,
        document_id: DocumentId,
        kind: MovementKind,
        lines: Vec<StockLine>,
    ) -> Result<(), LedgerError> {
        self.wait().await;

        let mut state = self.state.write().await;
        state.apply_calls += 1;
        if state.fail_on_apply {
            return Err(LedgerError::Unavailable(
                "injected failure on apply_movement".to_string(),
            ));
        }
        if lines.is_empty() {
            return Err(LedgerError::Rejected("movement has no lines".to_string()));
        }

        let movement = Movement { kind, lines };
        state.adjust(&movement, 1);
        state
            .movements
            .entry(document_id)
            .or_default()
            .push(movement);
        tracing::debug!(%document_id, %kind, "stock movement recorded");
        Ok(())
    }

    async fn reverse_movements(&self, document_id: DocumentId) -> Result<(), LedgerError> {
        self.wait().await;

        let mut state = self.state.write().await;
        if state.fail_on_reverse {
            return Err(LedgerError::Unavailable(
                "injected failure on reverse_movements".to_string(),
            ));
        }
        if let Some(movements) = state.movements.remove(&document_id) {
            for movement in &movements {
                state.adjust(movement, -1);
            }
        }
        Ok(())
    }
}
