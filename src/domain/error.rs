//! Typed error enums.
//!
//! `BackendError` classifies failures talking to either backend;
//! `MigrationError` is the single error surface of the migration operations,
//! carrying the HTTP-status hint the invocation boundary renders. Neither
//! display string ever contains credentials or raw backend bodies.

use thiserror::Error;

use crate::domain::status::DepStatus;

// ── Backend errors ────────────────────────────────────────────────────────────

/// A failed call against the legacy MDM or the inventory service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Credential exchange failed, or a request was still unauthorized after
    /// a forced token refresh.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Connection-level failure or timeout (after transport retries).
    #[error("{method} {url}: {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },

    /// A response status the caller could not classify.
    #[error("{method} {url}: unexpected status {status}")]
    UnexpectedStatus {
        method: String,
        url: String,
        status: u16,
    },

    /// A 2xx response whose body did not decode into the expected shape.
    #[error("{method} {url}: could not decode response: {message}")]
    Decode {
        method: String,
        url: String,
        message: String,
    },
}

impl BackendError {
    pub fn transport(method: &str, url: &str, message: impl ToString) -> Self {
        Self::Transport {
            method: method.to_owned(),
            url: url.to_owned(),
            message: message.to_string(),
        }
    }

    pub fn unexpected_status(method: &str, url: &str, status: u16) -> Self {
        Self::UnexpectedStatus {
            method: method.to_owned(),
            url: url.to_owned(),
            status,
        }
    }

    pub fn decode(method: &str, url: &str, message: impl ToString) -> Self {
        Self::Decode {
            method: method.to_owned(),
            url: url.to_owned(),
            message: message.to_string(),
        }
    }
}

// ── Migration errors ──────────────────────────────────────────────────────────

/// Errors surfaced by the migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("invalid serial number")]
    InvalidSerial,

    /// The device is unknown to both the inventory and the DEP service.
    #[error("device not found")]
    DeviceNotFound,

    /// The device is missing the ready tag or the expected DEP assignment.
    #[error("device not ready for migration")]
    NotReady,

    /// The DEP record does not match the expected enrollment profile.
    #[error("unexpected DEP status: {0}")]
    DepNotOk(DepStatus),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl MigrationError {
    /// HTTP-status hint for the invocation boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidSerial | Self::NotReady | Self::DepNotOk(_) => 400,
            Self::DeviceNotFound => 404,
            Self::Backend(_) => 500,
        }
    }
}
