//! Configuration loaded from `DEPSHIFT_*` environment variables via `envy`.

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::domain::MigrationTags;

/// Environment prefix: each field maps to `DEPSHIFT_<FIELD>`.
pub const ENV_PREFIX: &str = "DEPSHIFT_";

/// Everything the core depends on, supplied externally. HTTP-level values
/// are opaque strings; only non-emptiness is enforced.
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// Legacy MDM base URL, e.g. `https://mdm.example.com`.
    pub mdm_base_url: String,

    /// OAuth2 client id for the legacy MDM token endpoint.
    pub mdm_client_id: String,

    /// OAuth2 client secret for the legacy MDM token endpoint.
    pub mdm_client_secret: String,

    /// Inventory service base URL, e.g. `https://inventory.example.com`.
    pub inventory_base_url: String,

    /// Static bearer token for the inventory service.
    pub inventory_token: String,

    /// The DEP enrollment profile UUID a migrating device must carry.
    pub dep_profile_uuid: String,

    /// Taxonomy under which the migration tags live.
    pub taxonomy: String,

    #[serde(default = "default_ready_tag")]
    pub ready_tag: String,

    #[serde(default = "default_started_tag")]
    pub started_tag: String,

    #[serde(default = "default_unenrolled_tag")]
    pub unenrolled_tag: String,

    #[serde(default = "default_finished_tag")]
    pub finished_tag: String,
}

fn default_ready_tag() -> String {
    "ready".to_string()
}

fn default_started_tag() -> String {
    "started".to_string()
}

fn default_unenrolled_tag() -> String {
    "unenrolled".to_string()
}

fn default_finished_tag() -> String {
    "finished".to_string()
}

impl Settings {
    /// Load and validate settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or a value is
    /// empty.
    pub fn from_env() -> Result<Self> {
        let settings: Self = envy::prefixed(ENV_PREFIX).from_env().context(
            "failed to load config from DEPSHIFT_* env vars \
             (base URLs, credentials, DEP_PROFILE_UUID and TAXONOMY are required)",
        )?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("DEPSHIFT_MDM_BASE_URL", &self.mdm_base_url),
            ("DEPSHIFT_MDM_CLIENT_ID", &self.mdm_client_id),
            ("DEPSHIFT_MDM_CLIENT_SECRET", &self.mdm_client_secret),
            ("DEPSHIFT_INVENTORY_BASE_URL", &self.inventory_base_url),
            ("DEPSHIFT_INVENTORY_TOKEN", &self.inventory_token),
            ("DEPSHIFT_DEP_PROFILE_UUID", &self.dep_profile_uuid),
            ("DEPSHIFT_TAXONOMY", &self.taxonomy),
            ("DEPSHIFT_READY_TAG", &self.ready_tag),
            ("DEPSHIFT_STARTED_TAG", &self.started_tag),
            ("DEPSHIFT_UNENROLLED_TAG", &self.unenrolled_tag),
            ("DEPSHIFT_FINISHED_TAG", &self.finished_tag),
        ];
        for (name, value) in fields {
            ensure!(!value.is_empty(), "{name} must not be empty");
        }
        Ok(())
    }

    /// The four workflow tag names.
    #[must_use]
    pub fn migration_tags(&self) -> MigrationTags {
        MigrationTags {
            ready: self.ready_tag.clone(),
            started: self.started_tag.clone(),
            unenrolled: self.unenrolled_tag.clone(),
            finished: self.finished_tag.clone(),
        }
    }
}
