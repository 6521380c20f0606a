use chrono::{DateTime, NaiveDate, Utc};
use common::{BusinessId, CounterpartyId, DocumentId, ItemId, ProductId, VariantId, Version};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{DocumentKind, DocumentStatus, PaymentStatus};
use crate::money::Money;

/// A persisted purchase or sale header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub kind: DocumentKind,
    pub business_id: BusinessId,
    pub code: String,
    /// Supplier for a purchase, customer for a sale.
    pub counterparty_id: Option<CounterpartyId>,
    pub date: NaiveDate,
    pub status: DocumentStatus,
    pub payment_status: PaymentStatus,
    /// Sum of line nets, after line discounts and before the header discount.
    pub subtotal: Money,
    pub discount: Money,
    pub tax_rate: Decimal,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub notes: Option<String>,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Overwrites the editable header fields.
    pub fn apply_fields(&mut self, fields: DocumentFields) {
        self.code = fields.code;
        self.counterparty_id = fields.counterparty_id;
        self.date = fields.date;
        self.payment_status = fields.payment_status;
        self.subtotal = fields.subtotal;
        self.discount = fields.discount;
        self.tax_rate = fields.tax_rate;
        self.tax_amount = fields.tax_amount;
        self.total_amount = fields.total_amount;
        self.notes = fields.notes;
    }
}

/// Header fields written by create and update. Status is written separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFields {
    pub code: String,
    pub counterparty_id: Option<CounterpartyId>,
    pub date: NaiveDate,
    pub payment_status: PaymentStatus,
    pub subtotal: Money,
    pub discount: Money,
    pub tax_rate: Decimal,
    pub tax_amount: Money,
    pub total_amount: Money,
    pub notes: Option<String>,
}

/// A header ready to be inserted; the store assigns id, version and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub business_id: BusinessId,
    pub status: DocumentStatus,
    pub fields: DocumentFields,
}

/// Caller-supplied header for create and update.
///
/// Totals are not part of the input; they are always recomputed from the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    pub business_id: BusinessId,
    /// Generated when absent.
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub counterparty_id: Option<CounterpartyId>,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DocumentHeader {
    pub fn new(business_id: BusinessId, date: NaiveDate) -> Self {
        Self {
            business_id,
            code: None,
            counterparty_id: None,
            date,
            status: DocumentStatus::default(),
            payment_status: PaymentStatus::default(),
            discount: Money::zero(),
            tax_rate: Decimal::ZERO,
            notes: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_counterparty(mut self, counterparty_id: CounterpartyId) -> Self {
        self.counterparty_id = Some(counterparty_id);
        self
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = payment_status;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_tax_rate(mut self, tax_rate: Decimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A persisted line of a document.
///
/// Lines are written in batches and never edited individually; an update
/// replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentItem {
    pub id: ItemId,
    pub document_id: DocumentId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Money,
    pub bar_code: Option<String>,
    /// Product name frozen at write time.
    pub original_product_name: Option<String>,
    /// Variant name frozen at write time.
    pub original_variant_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DocumentItem {
    /// Returns the insertable form of this line, used to restore it.
    pub fn to_new(&self) -> NewDocumentItem {
        NewDocumentItem {
            product_id: self.product_id,
            variant_id: self.variant_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount: self.discount,
            bar_code: self.bar_code.clone(),
            original_product_name: self.original_product_name.clone(),
            original_variant_name: self.original_variant_name.clone(),
        }
    }
}

/// A line as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocumentItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default)]
    pub bar_code: Option<String>,
    #[serde(default)]
    pub original_product_name: Option<String>,
    #[serde(default)]
    pub original_variant_name: Option<String>,
}

impl NewDocumentItem {
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id,
            variant_id: None,
            quantity,
            unit_price,
            discount: Money::zero(),
            bar_code: None,
            original_product_name: None,
            original_variant_name: None,
        }
    }

    pub fn with_variant(mut self, variant_id: VariantId) -> Self {
        self.variant_id = Some(variant_id);
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_bar_code(mut self, bar_code: impl Into<String>) -> Self {
        self.bar_code = Some(bar_code.into());
        self
    }

    pub fn with_original_product_name(mut self, name: impl Into<String>) -> Self {
        self.original_product_name = Some(name.into());
        self
    }
}
