//! Purchase and sale documents.

mod kind;
mod model;
mod status;

pub use kind::DocumentKind;
pub use model::{Document, DocumentFields, DocumentHeader, DocumentItem, NewDocument, NewDocumentItem};
pub use status::{DocumentStatus, PaymentStatus};
