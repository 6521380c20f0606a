//! Validation errors.

use chrono::NaiveDate;
use common::{ProductId, VariantId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::document::DocumentStatus;
use crate::money::Money;

/// Malformed input, detected before any side effect takes place.
///
/// Line numbers are 1-based positions in the submitted item list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Document must contain at least one item")]
    NoItems,

    #[error("Invalid quantity on line {line}: {quantity} (must be greater than 0)")]
    InvalidQuantity { line: usize, quantity: u32 },

    #[error("Invalid unit price on line {line}: {price} (must not be negative)")]
    NegativeUnitPrice { line: usize, price: Money },

    #[error("Invalid discount on line {line}: {discount} (must be between 0 and {max})")]
    InvalidLineDiscount {
        line: usize,
        discount: Money,
        max: Money,
    },

    #[error("Amounts on line {line} are too large to compute")]
    LineAmountOverflow { line: usize },

    #[error("Document totals are too large to compute")]
    TotalOverflow,

    #[error("Invalid document discount: {discount} (must be between 0 and {max})")]
    InvalidHeaderDiscount { discount: Money, max: Money },

    #[error("Invalid tax rate: {0} (must be between 0 and 1)")]
    InvalidTaxRate(Decimal),

    #[error("Document code must not be blank")]
    BlankCode,

    #[error("Variant {variant_id} does not belong to product {product_id}")]
    VariantProductMismatch {
        variant_id: VariantId,
        product_id: ProductId,
    },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: DocumentStatus,
        to: DocumentStatus,
    },

    #[error(
        "Status cannot be changed by an update (stored {stored}, requested {requested}); use the status operation"
    )]
    StatusChangeViaUpdate {
        stored: DocumentStatus,
        requested: DocumentStatus,
    },

    #[error("Unknown sort column: {0}")]
    UnknownSortColumn(String),

    #[error("Unknown sort direction: {0} (expected asc or desc)")]
    UnknownSortDirection(String),

    #[error("Invalid page: {0} (pages start at 1)")]
    InvalidPage(u32),

    #[error("Invalid page size: {size} (must be between 1 and {max})")]
    InvalidPageSize { size: u32, max: u32 },

    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("Unknown document status: {0}")]
    UnknownStatus(String),

    #[error("Unknown payment status: {0}")]
    UnknownPaymentStatus(String),

    #[error("Unknown document kind: {0}")]
    UnknownKind(String),

    #[error("Unknown attribute type: {0}")]
    UnknownAttributeType(String),
}
