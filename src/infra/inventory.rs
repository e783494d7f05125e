//! Inventory/DEP backend adapter.
//!
//! Wraps a static bearer token and the retrying transport against the
//! inventory REST surface: DEP-device search, tag metadata, tag mutation.

use std::collections::BTreeSet;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::ports::InventoryDirectory;
use crate::domain::{BackendError, DepStatus};
use crate::infra::transport::RetryingClient;

// ── Serial path escaping ──────────────────────────────────────────────────────

/// Characters that survive percent-encoding untouched (the unreserved set).
const PATH_UNSAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Make a serial number safe to embed in a URL path segment.
///
/// Serials needing percent-encoding, or already starting with the reserved
/// `.` marker, become `.` followed by the unpadded URL-safe base64 of the
/// raw bytes. The backend reverses the transform; plain serials pass
/// through unchanged.
#[must_use]
pub fn path_safe_serial(serial: &str) -> String {
    if serial.starts_with('.') || utf8_percent_encode(serial, PATH_UNSAFE).to_string() != serial {
        format!(".{}", URL_SAFE_NO_PAD.encode(serial.as_bytes()))
    } else {
        serial.to_owned()
    }
}

// ── Response / request shapes ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DepDeviceSearch {
    count: u64,
    #[serde(default)]
    results: Vec<DepDevice>,
}

#[derive(Debug, Deserialize)]
struct DepDevice {
    #[serde(default)]
    profile_uuid: Option<String>,
    #[serde(default)]
    profile_status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MachineMeta {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TagWriteRequest<'a> {
    serial_numbers: [&'a str; 1],
    operations: [TagOperation<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TagOperation<'a> {
    kind: &'static str,
    taxonomy: &'a str,
    names: &'a [String],
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Backend adapter for the inventory service: DEP-enrollment lookup and
/// classification, tag read/write.
pub struct InventoryClient {
    http: RetryingClient,
    api_base_url: String,
    token: String,
    expected_profile_uuid: String,
}

impl InventoryClient {
    pub fn new(
        http: RetryingClient,
        base_url: &str,
        token: String,
        expected_profile_uuid: String,
    ) -> Self {
        Self {
            http,
            api_base_url: format!("{base_url}/api"),
            token,
            expected_profile_uuid,
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Token {}", self.token))
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        builder: RequestBuilder,
    ) -> Result<Response, BackendError> {
        let req = builder
            .build()
            .map_err(|e| BackendError::transport(method, url, e))?;
        self.http.execute(req).await
    }

    /// Fetch the device's DEP record. Exactly one match is the success case;
    /// zero (or any other count) means no DEP record.
    async fn dep_record(&self, serial: &str) -> Result<Option<DepDevice>, BackendError> {
        let url = format!("{}/mdm/dep/devices/", self.api_base_url);
        let builder = self
            .request(Method::GET, &url)
            .query(&[("serial_number", serial)]);
        let response = self.send("GET", &url, builder).await?;
        if !response.status().is_success() {
            return Err(BackendError::unexpected_status(
                "GET",
                &url,
                response.status().as_u16(),
            ));
        }
        let search: DepDeviceSearch = response
            .json()
            .await
            .map_err(|e| BackendError::decode("GET", &url, e))?;
        if search.count == 1 {
            info!(serial, "DEP device found");
            Ok(search.results.into_iter().next())
        } else {
            info!(serial, count = search.count, "unknown DEP device");
            Ok(None)
        }
    }
}

impl InventoryDirectory for InventoryClient {
    async fn dep_status(&self, serial: &str) -> Result<DepStatus, BackendError> {
        let record = self.dep_record(serial).await?;
        let status = classify_dep(record.as_ref(), &self.expected_profile_uuid);
        info!(serial, %status, "classified DEP enrollment");
        Ok(status)
    }

    async fn tags(&self, serial: &str) -> Result<Option<BTreeSet<String>>, BackendError> {
        let url = format!(
            "{}/inventory/machines/{}/meta/",
            self.api_base_url,
            path_safe_serial(serial)
        );
        let response = self
            .send("GET", &url, self.request(Method::GET, &url))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                info!(serial, "device unknown to inventory");
                Ok(None)
            }
            status if status.is_success() => {
                let meta: MachineMeta = response
                    .json()
                    .await
                    .map_err(|e| BackendError::decode("GET", &url, e))?;
                Ok(Some(meta.tags.into_iter().collect()))
            }
            status => Err(BackendError::unexpected_status("GET", &url, status.as_u16())),
        }
    }

    async fn set_tags(
        &self,
        serial: &str,
        taxonomy: &str,
        names: &[String],
    ) -> Result<(), BackendError> {
        info!(serial, taxonomy, ?names, "set device tags");
        let url = format!("{}/inventory/machines/tags/", self.api_base_url);
        // The mutation endpoint takes the raw serial in the body; escaping
        // applies only to path segments.
        let body = TagWriteRequest {
            serial_numbers: [serial],
            operations: [TagOperation {
                kind: "SET",
                taxonomy,
                names,
            }],
        };
        let builder = self.request(Method::POST, &url).json(&body);
        let response = self.send("POST", &url, builder).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(BackendError::unexpected_status(
                "POST",
                &url,
                response.status().as_u16(),
            ))
        }
    }
}

/// DEP classification table: no record, no profile, wrong profile, wrong
/// push status, OK.
fn classify_dep(record: Option<&DepDevice>, expected_profile_uuid: &str) -> DepStatus {
    let Some(record) = record else {
        return DepStatus::Unknown;
    };
    let Some(profile_uuid) = record.profile_uuid.as_deref().filter(|u| !u.is_empty()) else {
        warn!("DEP device has no profile");
        return DepStatus::MissingProfile;
    };
    if profile_uuid != expected_profile_uuid {
        warn!(profile_uuid, "wrong profile UUID for DEP device");
        return DepStatus::WrongProfile;
    }
    let profile_status = record.profile_status.as_deref().unwrap_or("-");
    if !matches!(profile_status, "assigned" | "pushed") {
        warn!(profile_status, "wrong profile status for DEP device");
        return DepStatus::WrongProfileStatus;
    }
    DepStatus::Ok
}
