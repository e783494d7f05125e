//! Bearer-token cache for the legacy MDM's OAuth2 client-credentials grant.

use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::BackendError;
use crate::infra::transport::RetryingClient;

/// A token closer than this to expiry is refreshed instead of reused.
const MIN_VALIDITY: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Holds at most one cached access token, refreshed lazily on first use,
/// on expiry, or on explicit invalidation (forced refresh after a 401).
///
/// The mutex serialises refreshes; concurrent invocations sharing one cache
/// wait on it rather than racing the token endpoint.
pub struct TokenCache {
    http: RetryingClient,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(
        http: RetryingClient,
        base_url: &str,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http,
            token_url: format!("{base_url}/api/oauth/token"),
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, refreshing it if necessary.
    ///
    /// # Errors
    ///
    /// [`BackendError::Auth`] when the credential exchange fails.
    pub async fn get(&self, force_refresh: bool) -> Result<String, BackendError> {
        let mut cached = self.cached.lock().await;
        if !force_refresh {
            if let Some(token) = cached.as_ref() {
                if Instant::now() + MIN_VALIDITY < token.expires_at {
                    debug!(url = %self.token_url, "re-use cached access token");
                    return Ok(token.value.clone());
                }
            }
        }
        debug!(url = %self.token_url, "fetch access token");
        let req = self
            .http
            .request(Method::POST, &self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "client_credentials"),
                ("client_secret", self.client_secret.as_str()),
            ])
            .build()
            .map_err(|e| BackendError::transport("POST", &self.token_url, e))?;
        let response = self.http.execute(req).await?;
        if response.status() != StatusCode::OK {
            return Err(BackendError::Auth(format!(
                "token endpoint returned status {}",
                response.status().as_u16()
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Auth(format!("could not decode token response: {e}")))?;
        let expires_at = Instant::now() + Duration::from_secs(body.expires_in);
        debug!(url = %self.token_url, expires_in = body.expires_in, "got access token");
        *cached = Some(CachedToken {
            value: body.access_token.clone(),
            expires_at,
        });
        Ok(body.access_token)
    }
}
