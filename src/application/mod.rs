//! Application layer — port trait definitions and the migration use-case.
//!
//! This module depends only on `crate::domain` — never on `crate::infra`.

pub mod migration;
pub mod ports;

pub use migration::{MigrationManager, OperationOutcome};
pub use ports::{InventoryDirectory, MdmDirectory};
