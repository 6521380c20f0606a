//! Document lifecycle service for purchases and sales.
//!
//! The document store has no transaction spanning several calls, so each
//! operation runs as a saga over these steps:
//! 1. Write the header
//! 2. Write (or replace) the lines as one batch
//! 3. Record or reverse the stock movement when the status calls for it
//!
//! If a step fails, previously completed steps are compensated in reverse
//! order. A failed compensation is reported as a partial failure that needs
//! manual reconciliation.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod instance;
pub mod services;
pub mod state;
pub mod steps;

pub use config::ServiceConfig;
pub use coordinator::DocumentService;
pub use error::{DocumentError, Result};
pub use instance::{Compensation, CompensationFailure, SagaInstance};
pub use services::{
    InMemoryInventoryLedger, InventoryLedger, LedgerError, MovementKind, StockLine,
};
pub use state::SagaState;
