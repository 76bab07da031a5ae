// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Relaydesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Relaydesk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelaydeskConfig {
    /// Console-wide settings.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Pairing session timing.
    #[serde(default)]
    pub session: SessionConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote pairing service settings.
    #[serde(default)]
    pub pairing: PairingConfig,
}

/// Console-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Timing of the pairing handshake.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Seconds between two status checks of an in-flight attempt.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds an attempt may stay unresolved before it fails with "timeout".
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// Capacity of the status broadcast feeding status streams.
    #[serde(default = "default_status_buffer")]
    pub status_buffer: usize,
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            status_buffer: default_status_buffer(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_handshake_timeout_secs() -> u64 {
    120
}

fn default_status_buffer() -> usize {
    64
}

/// Storage backend configuration.
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
        .map(|p| p.join("relaydesk").join("relaydesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("relaydesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Remote pairing service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PairingConfig {
    /// Base URL of the pairing REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request. `None` sends no Authorization header.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl PairingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults_match_handshake_contract() {
        let session = SessionConfig::default();
        assert_eq!(session.poll_interval(), Duration::from_secs(3));
        assert_eq!(session.handshake_timeout(), Duration::from_secs(120));
        assert_eq!(session.status_buffer, 64);
    }

    #[test]
    fn partial_session_section_keeps_other_defaults() {
        let config: RelaydeskConfig = toml::from_str(
            r#"
[session]
poll_interval_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.session.poll_interval_secs, 5);
        assert_eq!(config.session.handshake_timeout_secs, 120);
    }

    #[test]
    fn pairing_token_defaults_to_none() {
        let pairing = PairingConfig::default();
        assert!(pairing.api_token.is_none());
        assert_eq!(pairing.request_timeout(), Duration::from_secs(15));
    }
}
