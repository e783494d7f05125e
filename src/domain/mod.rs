//! Domain layer — pure types, status classification enums, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::application`,
//! `tokio`, or `reqwest`. All functions are synchronous and take data in,
//! returning data out.

pub mod error;
pub mod status;

pub use error::{BackendError, MigrationError};
pub use status::{
    DepStatus, MdmStatus, MigrationCheck, MigrationStatus, MigrationTags, Operation,
    UnmanageOutcome, validate_serial,
};
