//! Persistence contracts for documents and the catalog.
//!
//! The back office keeps its data in an external relational store. This
//! crate describes what the document services need from it and provides
//! in-memory implementations with fault injection.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod store;

pub use catalog::{CatalogStore, InMemoryCatalog};
pub use error::{Result, StoreError};
pub use memory::{FailPoint, InMemoryDocumentStore};
pub use store::{DocumentStore, DocumentStoreExt, UpdateOptions};
