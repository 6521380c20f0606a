//! External collaborators driven by the document service.

pub mod inventory;

pub use inventory::{
    InMemoryInventoryLedger, InventoryLedger, LedgerError, MovementKind, StockLine,
};
