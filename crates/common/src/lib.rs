//! Shared identifier and version types.

pub mod ids;
pub mod version;

pub use ids::{BrandId, BusinessId, CounterpartyId, DocumentId, ItemId, ProductId, VariantId};
pub use version::Version;
