// SPDX-FileCopyrightText: 2026 Floodline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./floodline.toml` > `~/.config/floodline/floodline.toml` > `/etc/floodline/floodline.toml`
//! with environment variable overrides via `FLOODLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::FloodlineConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/floodline/floodline.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "floodline.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/floodline/floodline.toml` (system-wide)
/// 3. `~/.config/floodline/floodline.toml` (user XDG config)
/// 4. `./floodline.toml` (local directory)
/// 5. `FLOODLINE_*` environment variables
pub fn load_config() -> Result<FloodlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<FloodlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FloodlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FloodlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FloodlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FloodlineConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// `~/.config/floodline/floodline.toml`, when a config dir exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("floodline").join(LOCAL_CONFIG_FILE))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `FLOODLINE_ENDPOINT_TIMEOUT_SECS` must map to
/// `endpoint.timeout_secs`, not `endpoint.timeout.secs`.
fn env_provider() -> Env {
    Env::prefixed("FLOODLINE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 5] = ["daemon", "storage", "endpoint", "queue", "sync"];

    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("endpoint_timeout_secs"), "endpoint.timeout_secs");
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("queue_max_attempts"), "queue.max_attempts");
        assert_eq!(map_env_key("sync_interval_secs"), "sync.interval_secs");
        assert_eq!(map_env_key("daemon_log_level"), "daemon.log_level");
    }

    #[test]
    fn unknown_section_is_left_untouched() {
        assert_eq!(map_env_key("telemetry_enabled"), "telemetry_enabled");
    }

    #[test]
    fn missing_file_path_falls_back_to_defaults() {
        let config = load_config_from_path(Path::new("/nonexistent/floodline.toml")).unwrap();
        assert_eq!(config.endpoint.timeout_secs, 10);
    }
}
