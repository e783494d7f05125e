//! Status enums, operation kinds, and serial-number validation.
//!
//! The wire spellings (`snake_case`, with DEP's `OK`) are load-bearing: they
//! are what the invocation boundary renders and what operators grep for.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::domain::error::MigrationError;

// ── DEP status ────────────────────────────────────────────────────────────────

/// Classification of a device's DEP record against the expected enrollment
/// profile. Derived on every call, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepStatus {
    /// No DEP record for the serial number.
    Unknown,
    /// A record exists but carries no profile at all.
    MissingProfile,
    /// The assigned profile is not the expected one.
    WrongProfile,
    /// Right profile, but its push status is neither assigned nor pushed.
    WrongProfileStatus,
    #[serde(rename = "OK")]
    Ok,
}

impl fmt::Display for DepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::MissingProfile => "missing_profile",
            Self::WrongProfile => "wrong_profile",
            Self::WrongProfileStatus => "wrong_profile_status",
            Self::Ok => "OK",
        };
        f.write_str(s)
    }
}

// ── Legacy MDM status ─────────────────────────────────────────────────────────

/// Classification of a device's enrollment record in the legacy MDM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MdmStatus {
    /// No enrollment record for the serial number.
    NotFound,
    Blocked,
    CheckedOut,
    /// Device certificate expired, or its expiry could not be parsed.
    InvalidCert,
    Enrolled,
}

impl MdmStatus {
    /// Whether this status means the device is no longer actively enrolled
    /// in the legacy MDM.
    #[must_use]
    pub fn is_unenrolled(self) -> bool {
        matches!(self, Self::NotFound | Self::CheckedOut)
    }
}

// ── Unmanage outcome ──────────────────────────────────────────────────────────

/// Result of the best-effort unmanage command against the legacy MDM.
///
/// Typed instead of a boolean so callers can tell "device absent" apart from
/// "command failed to queue"; the migration workflow treats both as non-fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmanageOutcome {
    /// The unmanage command was queued.
    Queued,
    /// The device has no record in the legacy MDM; nothing was sent.
    DeviceAbsent,
    /// The command endpoint rejected or failed the queue attempt.
    CommandFailed,
}

// ── Operation results ─────────────────────────────────────────────────────────

/// Result of the `check` operation. Transient, returned to the caller only.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationCheck {
    pub dep_status: DepStatus,
    /// Migration tags currently attached to the device.
    pub tags: BTreeSet<String>,
    pub eligible: bool,
}

/// Result of the `status` operation: both backends' view of enrollment.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MigrationStatus {
    pub legacy_status: MdmStatus,
    pub inventory_status: DepStatus,
}

// ── Operations ────────────────────────────────────────────────────────────────

/// The closed set of migration operations. Anything else is rejected at the
/// boundary before it reaches the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Check,
    Start,
    Status,
    Finish,
}

impl Operation {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Start => "start",
            Self::Status => "status",
            Self::Finish => "finish",
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(Self::Check),
            "start" => Ok(Self::Start),
            "status" => Ok(Self::Status),
            "finish" => Ok(Self::Finish),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── Migration tags ────────────────────────────────────────────────────────────

/// The four workflow tag names, mutually exclusive in intent within one
/// taxonomy. The backend does not enforce exclusivity; the SET tag writes do.
#[derive(Debug, Clone)]
pub struct MigrationTags {
    pub ready: String,
    pub started: String,
    pub unenrolled: String,
    pub finished: String,
}

impl MigrationTags {
    /// All four tag names, for intersecting against a device's current tags.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.ready.as_str(),
            self.started.as_str(),
            self.unenrolled.as_str(),
            self.finished.as_str(),
        ]
        .into_iter()
    }
}

// ── Serial-number validation ──────────────────────────────────────────────────

/// Validate a serial number before any network call is made.
///
/// # Errors
///
/// Returns [`MigrationError::InvalidSerial`] if the serial is empty or
/// implausibly short.
pub fn validate_serial(serial: &str) -> Result<(), MigrationError> {
    if serial.len() > 2 {
        Ok(())
    } else {
        Err(MigrationError::InvalidSerial)
    }
}
