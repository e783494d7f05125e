//! HTTP transport with a fixed timeout and bounded retry on transient
//! server errors.
//!
//! Connection-level failures are not retried here: only the retryable HTTP
//! statuses are, with exponential backoff. Every other response is returned
//! unchanged for the caller to interpret.

use std::time::Duration;

use reqwest::{Method, Request, RequestBuilder, Response};
use tracing::debug;

use crate::domain::BackendError;

/// Per-request timeout applied to every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP statuses worth a retry: transient server errors.
const RETRYABLE_STATUS: [u16; 4] = [500, 502, 503, 504];

/// Retry tuning. The defaults match the backends' rate limits; tests shrink
/// the backoff factor to keep runs fast.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Additional attempts after the first request.
    pub max_retries: u32,
    /// Backoff before retry `n` is `backoff_factor * 2^(n-1)`.
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: Duration::from_secs(1),
        }
    }
}

/// A `reqwest` client wrapper that applies the timeout and retry policy.
/// Stateless across calls; cheap to clone.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn new(policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self { client, policy })
    }

    /// Start building a request against `url`.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Send `req`, retrying transient server errors per the policy.
    ///
    /// # Errors
    ///
    /// [`BackendError::Transport`] on a connection-level failure or timeout.
    /// Non-2xx statuses are not errors at this layer.
    pub async fn execute(&self, req: Request) -> Result<Response, BackendError> {
        let method = req.method().clone();
        let url = req.url().clone();
        let mut attempt: u32 = 0;
        loop {
            let Some(attempt_req) = req.try_clone() else {
                // Streaming body, cannot be re-sent: single attempt.
                return self
                    .client
                    .execute(req)
                    .await
                    .map_err(|e| BackendError::transport(method.as_str(), url.as_str(), e));
            };
            let response = self
                .client
                .execute(attempt_req)
                .await
                .map_err(|e| BackendError::transport(method.as_str(), url.as_str(), e))?;
            let status = response.status().as_u16();
            if !RETRYABLE_STATUS.contains(&status) || attempt >= self.policy.max_retries {
                return Ok(response);
            }
            attempt += 1;
            let delay = self.policy.backoff_factor * 2_u32.pow(attempt - 1);
            debug!(method = %method, url = %url, status, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }
    }
}
