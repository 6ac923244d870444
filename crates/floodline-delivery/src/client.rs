// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the SOS intake API.
//!
//! Provides [`DeliveryClient`] which builds the POST request, attaches the
//! idempotency headers, and classifies the response into an [`Ack`], a
//! retryable transport failure, or a permanent rejection.

use std::time::Duration;

use floodline_core::{Ack, FloodlineError};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;

/// Header carrying the submission id as the server-side deduplication key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Header carrying the submission id for tracing on the server side.
pub const SUBMISSION_ID_HEADER: &str = "X-Submission-Id";

/// Longest slice of a rejection body kept in the error message.
const MAX_BODY_IN_ERROR: usize = 512;

/// Optional fields an intake server may return on success.
#[derive(Debug, Deserialize)]
struct AckBody {
    receipt: Option<String>,
    id: Option<String>,
}

/// HTTP client for SOS submission delivery.
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    url: String,
}

impl DeliveryClient {
    /// Creates a client posting to `url`.
    ///
    /// # Arguments
    /// * `url` - Full intake URL
    /// * `timeout` - Per-request timeout
    /// * `auth_token` - Optional bearer token sent with every request
    pub fn new(
        url: String,
        timeout: Duration,
        auth_token: Option<&str>,
    ) -> Result<Self, FloodlineError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                FloodlineError::Config(format!("invalid auth token header value: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| FloodlineError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self { client, url })
    }

    /// The intake URL this client posts to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts one serialized payload with `id` as the idempotency token.
    pub async fn post(&self, id: &str, payload: &str) -> Result<Ack, FloodlineError> {
        let response = self
            .client
            .post(&self.url)
            .header(IDEMPOTENCY_KEY_HEADER, id)
            .header(SUBMISSION_ID_HEADER, id)
            .body(payload.to_string())
            .send()
            .await
            .map_err(|e| FloodlineError::Transport {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(id, status = %status, "delivery response received");

        if status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let receipt = serde_json::from_str::<AckBody>(&body)
                .ok()
                .and_then(|b| b.receipt.or(b.id));
            return Ok(Ack {
                status: status.as_u16(),
                receipt,
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body))
    }
}

/// Returns true for HTTP status codes that mean "try again later".
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 425 | 429) || status.is_server_error()
}

/// Maps a non-2xx response onto the retryable/permanent split.
pub fn classify_failure(status: StatusCode, body: &str) -> FloodlineError {
    let body = truncate(body.trim(), MAX_BODY_IN_ERROR);
    let message = if body.is_empty() {
        format!("server returned {status}")
    } else {
        format!("server returned {status}: {body}")
    };

    if is_retryable_status(status) {
        FloodlineError::Transport {
            message,
            source: None,
        }
    } else {
        FloodlineError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
