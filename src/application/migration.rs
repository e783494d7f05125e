//! The migration state machine.
//!
//! Per-device workflow state is never stored here: every operation re-derives
//! it from backend truth (tags and enrollment records), so a prior call's
//! result is never trusted.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::application::ports::{InventoryDirectory, MdmDirectory};
use crate::domain::{
    DepStatus, MigrationCheck, MigrationError, MigrationStatus, MigrationTags, Operation,
    UnmanageOutcome, validate_serial,
};

/// Result of a dispatched operation: `start` and `finish` complete with a
/// bare success signal.
#[derive(Debug, Clone)]
pub enum OperationOutcome {
    Check(MigrationCheck),
    Status(MigrationStatus),
    Done,
}

/// Composes both backend adapters to implement the four migration
/// operations. Constructed explicitly with injected clients; holds no
/// mutable state of its own.
pub struct MigrationManager<M, I> {
    mdm: M,
    inventory: I,
    taxonomy: String,
    tags: MigrationTags,
}

impl<M: MdmDirectory, I: InventoryDirectory> MigrationManager<M, I> {
    pub fn new(mdm: M, inventory: I, taxonomy: String, tags: MigrationTags) -> Self {
        Self {
            mdm,
            inventory,
            taxonomy,
            tags,
        }
    }

    /// Dispatch an operation by kind.
    ///
    /// # Errors
    ///
    /// Propagates the dispatched operation's error.
    pub async fn execute(
        &self,
        op: Operation,
        serial: &str,
    ) -> Result<OperationOutcome, MigrationError> {
        match op {
            Operation::Check => self.check(serial).await.map(OperationOutcome::Check),
            Operation::Start => self.start(serial).await.map(|()| OperationOutcome::Done),
            Operation::Status => self.status(serial).await.map(OperationOutcome::Status),
            Operation::Finish => self.finish(serial).await.map(|()| OperationOutcome::Done),
        }
    }

    /// Report whether the device is eligible for migration. Never mutates
    /// backend state.
    ///
    /// # Errors
    ///
    /// [`MigrationError::DeviceNotFound`] when the device is unknown to both
    /// the inventory and the DEP service; backend failures otherwise.
    pub async fn check(&self, serial: &str) -> Result<MigrationCheck, MigrationError> {
        validate_serial(serial)?;
        self.check_eligibility(serial).await
    }

    /// Begin the migration: unmanage in the legacy MDM, then flip the tag to
    /// started.
    ///
    /// Eligibility is recomputed synchronously within this call — never from
    /// a cached or prior result. Without that, this operation could be used
    /// to unenroll the whole fleet without making sure the devices can
    /// enroll again.
    ///
    /// # Errors
    ///
    /// [`MigrationError::NotReady`] when the device is not eligible; backend
    /// failures from the check or the tag write. An unmanage failure is
    /// logged but never blocks the tag transition.
    pub async fn start(&self, serial: &str) -> Result<(), MigrationError> {
        validate_serial(serial)?;
        info!(serial, "start device migration");
        let check = self.check_eligibility(serial).await?;
        if !check.eligible {
            warn!(serial, dep_status = %check.dep_status, "device not ready for migration");
            return Err(MigrationError::NotReady);
        }
        // Unmanage before the tag flip: a crash mid-operation leaves the
        // device either untouched or flagged started with an unmanage
        // attempt already made.
        match self.mdm.unmanage(serial).await {
            Ok(UnmanageOutcome::Queued) => info!(serial, "unmanage command queued"),
            Ok(UnmanageOutcome::DeviceAbsent) => {
                info!(serial, "device absent from legacy MDM, nothing to unmanage");
            }
            Ok(UnmanageOutcome::CommandFailed) => {
                warn!(serial, "unmanage command could not be queued, continuing");
            }
            Err(err) => warn!(serial, %err, "unmanage failed, continuing"),
        }
        self.inventory
            .set_tags(serial, &self.taxonomy, std::slice::from_ref(&self.tags.started))
            .await?;
        info!(serial, "device migration started");
        Ok(())
    }

    /// Report both backends' enrollment view of a migrating device.
    ///
    /// When the legacy MDM no longer knows the device, the unenrolled tag is
    /// set opportunistically; a failed tag write is logged, not propagated.
    ///
    /// # Errors
    ///
    /// [`MigrationError::DepNotOk`] when the device is not enrolled under
    /// the expected DEP profile; backend failures otherwise.
    pub async fn status(&self, serial: &str) -> Result<MigrationStatus, MigrationError> {
        validate_serial(serial)?;
        let dep_status = self.inventory.dep_status(serial).await?;
        if dep_status != DepStatus::Ok {
            warn!(serial, %dep_status, "device not DEP enrolled under the expected profile");
            return Err(MigrationError::DepNotOk(dep_status));
        }
        let legacy_status = self.mdm.enrollment_status(serial).await?;
        if legacy_status.is_unenrolled() {
            info!(serial, ?legacy_status, "device unenrolled from legacy MDM, updating tag");
            if let Err(err) = self
                .inventory
                .set_tags(serial, &self.taxonomy, std::slice::from_ref(&self.tags.unenrolled))
                .await
            {
                warn!(serial, %err, "could not set unenrolled tag");
            }
        }
        Ok(MigrationStatus {
            legacy_status,
            inventory_status: dep_status,
        })
    }

    /// Close the migration by setting the finished tag. No precondition: an
    /// administrative action, idempotent by SET semantics.
    ///
    /// # Errors
    ///
    /// Backend failures from the tag write.
    pub async fn finish(&self, serial: &str) -> Result<(), MigrationError> {
        validate_serial(serial)?;
        info!(serial, "finish device migration");
        self.inventory
            .set_tags(serial, &self.taxonomy, std::slice::from_ref(&self.tags.finished))
            .await?;
        info!(serial, "device migration finished");
        Ok(())
    }

    /// Derive eligibility from current backend state: read-only.
    async fn check_eligibility(&self, serial: &str) -> Result<MigrationCheck, MigrationError> {
        let tags = self.inventory.tags(serial).await?;
        let dep_status = self.inventory.dep_status(serial).await?;
        if tags.is_none() && dep_status == DepStatus::Unknown {
            info!(serial, "device unknown to both inventory and DEP");
            return Err(MigrationError::DeviceNotFound);
        }
        // A partially-known device still yields a result.
        let current = tags.unwrap_or_default();
        let tags: BTreeSet<String> = self
            .tags
            .iter()
            .filter(|name| current.contains(*name))
            .map(str::to_owned)
            .collect();
        let eligible = tags.contains(&self.tags.ready) && dep_status == DepStatus::Ok;
        info!(serial, %dep_status, eligible, "device checked");
        Ok(MigrationCheck {
            dep_status,
            tags,
            eligible,
        })
    }
}
