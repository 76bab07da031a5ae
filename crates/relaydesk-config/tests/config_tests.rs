// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Relaydesk configuration system.

use std::io::Write;
use std::time::Duration;

use relaydesk_config::diagnostic::{ConfigError, suggest_key};
use relaydesk_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Valid TOML with every section deserializes successfully.
#[test]
fn valid_toml_deserializes_into_relaydesk_config() {
    let toml = r#"
[console]
log_level = "debug"

[session]
poll_interval_secs = 2
handshake_timeout_secs = 60
status_buffer = 16

[storage]
database_path = "/tmp/relaydesk-test.db"
wal_mode = false

[pairing]
base_url = "https://pairing.example.com"
api_token = "secret"
request_timeout_secs = 5
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.console.log_level, "debug");
    assert_eq!(config.session.poll_interval(), Duration::from_secs(2));
    assert_eq!(config.session.handshake_timeout(), Duration::from_secs(60));
    assert_eq!(config.session.status_buffer, 16);
    assert_eq!(config.storage.database_path, "/tmp/relaydesk-test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.pairing.base_url, "https://pairing.example.com");
    assert_eq!(config.pairing.api_token.as_deref(), Some("secret"));
    assert_eq!(config.pairing.request_timeout(), Duration::from_secs(5));
}

/// Empty input yields the documented defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.session.poll_interval(), Duration::from_secs(3));
    assert_eq!(config.session.handshake_timeout(), Duration::from_secs(120));
    assert_eq!(config.console.log_level, "info");
    assert!(config.pairing.api_token.is_none());
}

/// A typo in a session key is reported as unknown with a suggestion.
#[test]
fn unknown_session_key_suggests_correction() {
    let toml = r#"
[session]
poll_intervl_secs = 5
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            valid_keys,
            ..
        } => {
            assert_eq!(key, "poll_intervl_secs");
            assert_eq!(suggestion.as_deref(), Some("poll_interval_secs"));
            assert!(valid_keys.contains("handshake_timeout_secs"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Unknown top-level sections are rejected.
#[test]
fn unknown_section_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

/// A string where a number is expected is an invalid type.
#[test]
fn wrong_type_reported() {
    let toml = r#"
[session]
poll_interval_secs = "three"
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_errors_surface_through_loader() {
    let toml = r#"
[session]
poll_interval_secs = 30
handshake_timeout_secs = 10
"#;
    let errors = load_and_validate_str(toml).unwrap_err();
    assert!(matches!(errors[0], ConfigError::Validation { .. }));
}

/// Loading from an explicit path works and keeps defaults for absent sections.
#[test]
fn load_from_path() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[pairing]\nbase_url = \"http://localhost:9999\"").unwrap();
    let config = load_and_validate_path(file.path()).unwrap();
    assert_eq!(config.pairing.base_url, "http://localhost:9999");
    assert_eq!(config.session.poll_interval_secs, 3);
}

#[test]
fn suggest_key_picks_closest() {
    let valid = &["base_url", "api_token", "request_timeout_secs"];
    assert_eq!(suggest_key("api_tokn", valid), Some("api_token".to_string()));
}
