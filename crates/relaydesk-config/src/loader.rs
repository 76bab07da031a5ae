// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./relaydesk.toml` > `~/.config/relaydesk/relaydesk.toml` >
//! `/etc/relaydesk/relaydesk.toml` with environment variable overrides via `RELAYDESK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RelaydeskConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/relaydesk/relaydesk.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "relaydesk.toml";

/// Path of the per-user config file, if a config dir exists.
pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("relaydesk/relaydesk.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/relaydesk/relaydesk.toml` (system-wide)
/// 3. `~/.config/relaydesk/relaydesk.toml` (user XDG config)
/// 4. `./relaydesk.toml` (local directory)
/// 5. `RELAYDESK_*` environment variables
pub fn load_config() -> Result<RelaydeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<RelaydeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelaydeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RelaydeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RelaydeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RelaydeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `RELAYDESK_SESSION_POLL_INTERVAL_SECS` must map to
/// `session.poll_interval_secs`, not `session.poll.interval.secs`.
fn env_provider() -> Env {
    Env::prefixed("RELAYDESK_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to its dotted config key.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 4] = ["console", "session", "storage", "pairing"];
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
    fn env_keys_split_only_at_section() {
        assert_eq!(
            map_env_key("session_poll_interval_secs"),
            "session.poll_interval_secs"
        );
        assert_eq!(map_env_key("pairing_api_token"), "pairing.api_token");
        assert_eq!(map_env_key("console_log_level"), "console.log_level");
    }

    #[test]
    fn unknown_env_section_is_left_alone() {
        assert_eq!(map_env_key("unrelated_key"), "unrelated_key");
    }
}
