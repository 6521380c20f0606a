//! Read side for purchases and sales.
//!
//! This crate provides:
//! - [`DocumentReader`] loading a header with its flattened lines and totals
//! - Validated, paginated listing of headers
//! - [`DocumentDetail`], the view returned to clients

pub mod error;
pub mod read_model;
pub mod reader;

pub use error::{Result, ViewError};
pub use read_model::DocumentDetail;
pub use reader::DocumentReader;
