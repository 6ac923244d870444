// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes and the ordering between the lease and the delivery timeout.

use crate::diagnostic::ConfigError;
use crate::model::FloodlineConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FloodlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.daemon.log_level.as_str()) {
        fail(format!(
            "daemon.log_level `{}` must be one of {}",
            config.daemon.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let url = config.endpoint.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        fail(format!(
            "endpoint.url `{url}` must start with http:// or https://"
        ));
    }

    if config.endpoint.timeout_secs == 0 {
        fail("endpoint.timeout_secs must be at least 1".to_string());
    }

    if config.queue.flush_concurrency == 0 {
        fail("queue.flush_concurrency must be at least 1".to_string());
    }

    // A lease shorter than the delivery timeout would let a second flush
    // re-claim an entry whose first attempt is still in flight.
    if config.queue.lease_secs <= config.endpoint.timeout_secs {
        fail(format!(
            "queue.lease_secs ({}) must be greater than endpoint.timeout_secs ({})",
            config.queue.lease_secs, config.endpoint.timeout_secs
        ));
    }

    if config.sync.interval_secs == 0 {
        fail("sync.interval_secs must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
