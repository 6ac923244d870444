// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the adapter traits and the submission queue.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp format shared by Rust-side and SQL-side (`strftime('%Y-%m-%dT%H:%M:%fZ')`) writers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Current UTC time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Client-generated submission identifier (UUID v4 text).
///
/// Doubles as the idempotency token sent with every delivery attempt.
pub type SubmissionId = String;

/// Generate a fresh submission id.
pub fn new_submission_id() -> SubmissionId {
    uuid::Uuid::new_v4().to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Delivery,
}

/// Lifecycle state of a stored submission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    /// Awaiting delivery; picked up by every flush.
    Pending,
    /// Permanently failed (rejected or attempt cap reached); awaits manual intervention.
    Failed,
}

/// A durable SOS submission as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SosSubmission {
    /// Primary key and idempotency token.
    pub id: SubmissionId,
    /// Serialized payload, delivered byte-for-byte.
    pub payload: String,
    pub status: SubmissionStatus,
    /// Number of dispatch attempts that did not end in deletion.
    pub attempt_count: u32,
    /// Last transport or server failure reason.
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SosSubmission {
    /// Build a fresh pending submission with `attempt_count = 0` and `created_at = now`.
    pub fn new(id: String, payload: String) -> Self {
        let now = now_timestamp();
        Self {
            id,
            payload,
            status: SubmissionStatus::Pending,
            attempt_count: 0,
            last_error: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Parse the stored payload back into JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// Confirmation returned by a delivery endpoint on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Status code reported by the remote side (2xx for HTTP).
    pub status: u16,
    /// Server-assigned reference for the emergency record, if any.
    pub receipt: Option<String>,
}

/// Outcome counts of one flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Acknowledged and removed from the store.
    pub delivered: usize,
    /// Attempted but still queued for a later retry.
    pub pending: usize,
    /// Newly marked permanently failed.
    pub failed: usize,
    /// Held by a concurrent flush; not attempted here.
    pub skipped: usize,
}

impl DeliveryReport {
    /// Total entries this flush looked at.
    pub fn total(&self) -> usize {
        self.delivered + self.pending + self.failed + self.skipped
    }
}

/// Per-status entry counts for status display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub failed: usize,
}
