// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Floodline SOS queue.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Floodline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FloodlineConfig {
    /// Process-level settings (logging).
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote delivery endpoint settings.
    #[serde(default)]
    pub endpoint: EndpointConfig,

    /// Retry and flush policy.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Background sync scheduling.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("floodline").join("floodline.db"))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "floodline.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Rescue-coordination backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// URL that accepts `POST` of one SOS record.
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    /// Upper bound on a single delivery attempt, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token sent with every delivery. `None` sends no Authorization header.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            timeout_secs: default_timeout_secs(),
            auth_token: None,
        }
    }
}

fn default_endpoint_url() -> String {
    "http://127.0.0.1:8080/api/sos".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Retry and flush policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Failed attempts after which an entry is marked permanently failed. `0` disables the cap.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Number of deliveries a single flush runs at once.
    #[serde(default = "default_flush_concurrency")]
    pub flush_concurrency: usize,

    /// How long a flush holds its claim on an entry. Must exceed `endpoint.timeout_secs`.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            flush_concurrency: default_flush_concurrency(),
            lease_secs: default_lease_secs(),
        }
    }
}

impl QueueConfig {
    /// The attempt cap, or `None` when retries are unbounded.
    pub fn attempt_cap(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }
}

fn default_max_attempts() -> u32 {
    20
}

fn default_flush_concurrency() -> usize {
    4
}

fn default_lease_secs() -> u64 {
    120
}

/// Background sync scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    /// Seconds between periodic flushes while serving.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Run one flush immediately when `serve` starts.
    #[serde(default = "default_flush_on_start")]
    pub flush_on_start: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            flush_on_start: default_flush_on_start(),
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_flush_on_start() -> bool {
    true
}
