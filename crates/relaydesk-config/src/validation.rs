// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: non-zero timings, a handshake
//! timeout that leaves room for at least one poll, and a usable service URL.

use crate::diagnostic::ConfigError;
use crate::model::RelaydeskConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &RelaydeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.console.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "console.log_level `{}` must be one of: {}",
            config.console.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    let session = &config.session;
    if session.poll_interval_secs == 0 {
        errors.push(ConfigError::validation(
            "session.poll_interval_secs must be greater than 0",
        ));
    }
    if session.handshake_timeout_secs < session.poll_interval_secs {
        errors.push(ConfigError::validation(format!(
            "session.handshake_timeout_secs ({}) must not be shorter than session.poll_interval_secs ({})",
            session.handshake_timeout_secs, session.poll_interval_secs
        )));
    }
    if session.status_buffer == 0 {
        errors.push(ConfigError::validation(
            "session.status_buffer must be greater than 0",
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let base_url = config.pairing.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "pairing.base_url `{base_url}` must start with http:// or https://"
        )));
    }
    if config.pairing.request_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "pairing.request_timeout_secs must be greater than 0",
        ));
    }
    if let Some(token) = &config.pairing.api_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "pairing.api_token must not be blank when set",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        assert!(validate_config(&RelaydeskConfig::default()).is_ok());
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let mut config = RelaydeskConfig::default();
        config.session.poll_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| e.to_string().contains("poll_interval_secs"))
        );
    }

    #[test]
    fn timeout_shorter_than_interval_rejected() {
        let mut config = RelaydeskConfig::default();
        config.session.poll_interval_secs = 10;
        config.session.handshake_timeout_secs = 5;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("handshake_timeout_secs"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = RelaydeskConfig::default();
        config.storage.database_path = "  ".to_string();
        config.pairing.base_url = "ftp://pairing".to_string();
        config.session.status_buffer = 0;
        config.console.log_level = "loud".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn blank_api_token_rejected() {
        let mut config = RelaydeskConfig::default();
        config.pairing.api_token = Some(String::new());
        assert!(validate_config(&config).is_err());
    }
}
