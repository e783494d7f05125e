//! Legacy MDM backend adapter.
//!
//! Wraps the token cache and retrying transport against the legacy MDM REST
//! surface. Every call re-attempts once on a 401 after forcing a token
//! refresh; a second 401 is fatal.

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use crate::application::ports::MdmDirectory;
use crate::domain::{BackendError, MdmStatus, UnmanageOutcome};
use crate::infra::token::TokenCache;
use crate::infra::transport::RetryingClient;

// ── Response shapes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ComputerRecord {
    computer: Computer,
}

#[derive(Debug, Deserialize)]
struct Computer {
    general: ComputerGeneral,
}

#[derive(Debug, Deserialize)]
struct ComputerGeneral {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct EnrolledDeviceSearch {
    count: u64,
    #[serde(default)]
    results: Vec<EnrolledDevice>,
}

#[derive(Debug, Deserialize)]
struct EnrolledDevice {
    created_at: DateTime<Utc>,
    #[serde(default)]
    blocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    checkout_at: Option<DateTime<Utc>>,
    /// Kept as a raw string: an unparsable expiry must classify as an
    /// invalid certificate, not fail the whole decode.
    #[serde(default)]
    cert_not_valid_after: Option<String>,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Backend adapter for the legacy MDM: device lookup, best-effort unmanage,
/// enrollment-status classification.
pub struct LegacyMdmClient {
    http: RetryingClient,
    tokens: TokenCache,
    base_url: String,
    api_base_url: String,
}

impl LegacyMdmClient {
    pub fn new(
        http: RetryingClient,
        base_url: String,
        client_id: String,
        client_secret: String,
    ) -> Self {
        let tokens = TokenCache::new(http.clone(), &base_url, client_id, client_secret);
        let api_base_url = format!("{base_url}/JSSResource");
        Self {
            http,
            tokens,
            base_url,
            api_base_url,
        }
    }

    /// Send an authorized request, forcing a token refresh and re-sending
    /// once if the backend answers 401.
    async fn send_authorized(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Response, BackendError> {
        let mut force_refresh = false;
        for _ in 0..2 {
            let token = self.tokens.get(force_refresh).await?;
            let req = self
                .http
                .request(method.clone(), url)
                .query(query)
                .header(ACCEPT, "application/json")
                .bearer_auth(&token)
                .build()
                .map_err(|e| BackendError::transport(method.as_str(), url, e))?;
            let response = self.http.execute(req).await?;
            if response.status() == StatusCode::UNAUTHORIZED {
                force_refresh = true;
                continue;
            }
            return Ok(response);
        }
        Err(BackendError::Auth(format!(
            "{method} {url}: still unauthorized after token refresh"
        )))
    }
}

impl MdmDirectory for LegacyMdmClient {
    async fn find_device_id(&self, serial: &str) -> Result<Option<u64>, BackendError> {
        let url = format!("{}/computers/serialnumber/{serial}", self.api_base_url);
        let response = self.send_authorized(Method::GET, &url, &[]).await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                info!(serial, "unknown legacy MDM computer");
                Ok(None)
            }
            status if status.is_success() => {
                let record: ComputerRecord = response
                    .json()
                    .await
                    .map_err(|e| BackendError::decode("GET", &url, e))?;
                let id = record.computer.general.id;
                info!(serial, id, "found legacy MDM computer");
                Ok(Some(id))
            }
            status => Err(BackendError::unexpected_status("GET", &url, status.as_u16())),
        }
    }

    async fn unmanage(&self, serial: &str) -> Result<UnmanageOutcome, BackendError> {
        info!(serial, "unmanage computer");
        let Some(id) = self.find_device_id(serial).await? else {
            return Ok(UnmanageOutcome::DeviceAbsent);
        };
        let url = format!(
            "{}/computercommands/command/UnmanageDevice/id/{id}",
            self.api_base_url
        );
        // Best-effort: a failure to queue the command must never abort the
        // caller's workflow.
        match self.send_authorized(Method::POST, &url, &[]).await {
            Ok(response) if response.status().is_success() => {
                info!(serial, id, "unmanage command queued");
                Ok(UnmanageOutcome::Queued)
            }
            Ok(response) => {
                warn!(
                    serial,
                    id,
                    status = response.status().as_u16(),
                    "could not queue unmanage command"
                );
                Ok(UnmanageOutcome::CommandFailed)
            }
            Err(err) => {
                warn!(serial, id, %err, "could not queue unmanage command");
                Ok(UnmanageOutcome::CommandFailed)
            }
        }
    }

    async fn enrollment_status(&self, serial: &str) -> Result<MdmStatus, BackendError> {
        let url = format!("{}/api/mdm/devices/", self.base_url);
        let response = self
            .send_authorized(Method::GET, &url, &[("serial_number", serial)])
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::unexpected_status(
                "GET",
                &url,
                response.status().as_u16(),
            ));
        }
        let search: EnrolledDeviceSearch = response
            .json()
            .await
            .map_err(|e| BackendError::decode("GET", &url, e))?;
        info!(serial, count = search.count, "found enrolled device record(s)");
        // Multiple records per serial are possible after re-enrollments;
        // the latest one wins.
        let latest = search.results.into_iter().max_by_key(|d| d.created_at);
        let status = classify_enrollment(latest.as_ref(), Utc::now());
        info!(serial, ?status, "classified legacy MDM enrollment");
        Ok(status)
    }
}

/// Classify an enrollment record, in priority order: missing record, block
/// marker, checkout marker, certificate validity.
fn classify_enrollment(device: Option<&EnrolledDevice>, now: DateTime<Utc>) -> MdmStatus {
    let Some(device) = device else {
        return MdmStatus::NotFound;
    };
    if device.blocked_at.is_some() {
        return MdmStatus::Blocked;
    }
    if device.checkout_at.is_some() {
        return MdmStatus::CheckedOut;
    }
    let valid_cert = device
        .cert_not_valid_after
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .is_some_and(|not_after| not_after > now);
    if valid_cert {
        MdmStatus::Enrolled
    } else {
        // Expired, absent, or unparsable all count as invalid.
        MdmStatus::InvalidCert
    }
}
