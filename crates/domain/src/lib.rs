//! Domain model for the retail back-office document services.
//!
//! This crate is pure (no I/O) and provides:
//! - Money and catalog value types (products, variants, typed attributes)
//! - Purchase and sale documents with their status state machine
//! - The attribute resolver and line-item flattener used by every read
//! - The totals calculator shared by the write and read paths
//! - Input validation and the validated list-query surface

pub mod catalog;
pub mod document;
pub mod error;
pub mod line_item;
pub mod money;
pub mod query;
pub mod totals;
pub mod validation;

pub use catalog::{Attribute, AttributeType, Brand, Product, Variant};
pub use document::{
    Document, DocumentFields, DocumentHeader, DocumentItem, DocumentKind, DocumentStatus,
    NewDocument, NewDocumentItem, PaymentStatus,
};
pub use error::ValidationError;
pub use line_item::{CombinedLineItem, flatten, resolve_attributes};
pub use money::Money;
pub use query::{DocumentFilter, ListQuery, ListRequest, Page, Sort, SortColumn, SortDirection};
pub use totals::{LineAmounts, Totals, calculate_totals};
pub use validation::validate_document;
