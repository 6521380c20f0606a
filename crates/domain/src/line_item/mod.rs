//! Read-side projection of document lines onto the live catalog.

mod attributes;
mod combined;

pub use attributes::resolve_attributes;
pub use combined::{CombinedLineItem, flatten};
