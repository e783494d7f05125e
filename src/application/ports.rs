//! Port trait definitions for the application layer.
//!
//! Ports are the contracts the backend adapters must fulfill. This file
//! imports only from `crate::domain` — never from `crate::infra`.

use std::collections::BTreeSet;

use crate::domain::{BackendError, DepStatus, MdmStatus, UnmanageOutcome};

// ── Legacy MDM port ───────────────────────────────────────────────────────────

/// Device operations against the legacy MDM being migrated away from.
#[allow(async_fn_in_trait)]
pub trait MdmDirectory {
    /// Look up the backend's device id for a serial number.
    ///
    /// Returns `Ok(None)` when the device is unknown — "missing" is an
    /// expected, non-exceptional outcome.
    async fn find_device_id(&self, serial: &str) -> Result<Option<u64>, BackendError>;

    /// Queue an unmanage command for the device, best-effort.
    ///
    /// A failure to queue the command must be reported as
    /// [`UnmanageOutcome::CommandFailed`], not as an error; only failures of
    /// the device lookup itself may propagate.
    async fn unmanage(&self, serial: &str) -> Result<UnmanageOutcome, BackendError>;

    /// Classify the device's enrollment record.
    async fn enrollment_status(&self, serial: &str) -> Result<MdmStatus, BackendError>;
}

// ── Inventory / DEP port ──────────────────────────────────────────────────────

/// Device operations against the inventory service, authoritative for DEP
/// profile assignment and tag state.
#[allow(async_fn_in_trait)]
pub trait InventoryDirectory {
    /// Classify the device's DEP record against the expected profile.
    async fn dep_status(&self, serial: &str) -> Result<DepStatus, BackendError>;

    /// Read the device's tags.
    ///
    /// Returns `Ok(None)` when the device is entirely unknown to inventory
    /// (404); an empty set means known but untagged.
    async fn tags(&self, serial: &str) -> Result<Option<BTreeSet<String>>, BackendError>;

    /// Replace the device's tags within `taxonomy` with `names` (SET
    /// semantics: prior tags in the taxonomy are cleared). Idempotent.
    async fn set_tags(
        &self,
        serial: &str,
        taxonomy: &str,
        names: &[String],
    ) -> Result<(), BackendError>;
}
