// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `relaydesk config check`: validate configuration and probe adapters.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use colored::Colorize;

use relaydesk_config::RelaydeskConfig;
use relaydesk_core::{ConnectionStore, HealthStatus, PluginAdapter, RelaydeskError};
use relaydesk_pairing_http::HttpPairingService;
use relaydesk_storage::SqliteConnectionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

/// Probe the store and the pairing service. Returns `true` when nothing failed.
pub async fn run_check(config: &RelaydeskConfig, plain: bool) -> bool {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        CheckResult {
            name: "config".into(),
            status: CheckStatus::Pass,
            message: format!(
                "poll every {}s, give up after {}s",
                config.session.poll_interval_secs, config.session.handshake_timeout_secs
            ),
            duration: Duration::ZERO,
        },
        check_store(config).await,
        check_pairing(config).await,
    ];

    println!();
    println!("  relaydesk config check");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("  {}", render(result, use_color));
    }
    println!();

    !results.iter().any(|r| r.status == CheckStatus::Fail)
}

async fn check_store(config: &RelaydeskConfig) -> CheckResult {
    let start = Instant::now();
    let store = SqliteConnectionStore::new(config.storage.clone());
    let outcome = async {
        store.initialize().await?;
        let health = store.health_check().await?;
        let count = store.load_all().await?.len();
        store.close().await?;
        Ok::<_, RelaydeskError>((health, count))
    }
    .await;

    let (status, message) = match outcome {
        Ok((health, count)) => {
            let (status, detail) = classify(health);
            let message = match detail {
                Some(detail) => format!("{detail} ({})", config.storage.database_path),
                None => format!("{count} connection(s) in {}", config.storage.database_path),
            };
            (status, message)
        }
        Err(e) => (CheckStatus::Fail, e.to_string()),
    };
    CheckResult {
        name: "storage".into(),
        status,
        message,
        duration: start.elapsed(),
    }
}

async fn check_pairing(config: &RelaydeskConfig) -> CheckResult {
    let start = Instant::now();
    let outcome = match HttpPairingService::new(&config.pairing) {
        Ok(service) => service.health_check().await,
        Err(e) => Err(e),
    };

    let (status, message) = match outcome {
        Ok(health) => {
            let (status, detail) = classify(health);
            (status, detail.unwrap_or_else(|| config.pairing.base_url.clone()))
        }
        Err(e) => (CheckStatus::Fail, e.to_string()),
    };
    CheckResult {
        name: "pairing service".into(),
        status,
        message,
        duration: start.elapsed(),
    }
}

fn classify(health: HealthStatus) -> (CheckStatus, Option<String>) {
    match health {
        HealthStatus::Healthy => (CheckStatus::Pass, None),
        HealthStatus::Degraded(detail) => (CheckStatus::Warn, Some(detail)),
        HealthStatus::Unhealthy(detail) => (CheckStatus::Fail, Some(detail)),
    }
}

fn render(result: &CheckResult, use_color: bool) -> String {
    let symbol = match result.status {
        CheckStatus::Pass => "✓",
        CheckStatus::Warn => "!",
        CheckStatus::Fail => "✗",
    };
    let symbol = if use_color {
        match result.status {
            CheckStatus::Pass => symbol.green().to_string(),
            CheckStatus::Warn => symbol.yellow().to_string(),
            CheckStatus::Fail => symbol.red().to_string(),
        }
    } else {
        symbol.to_string()
    };
    format!(
        "{symbol} {:<16} {} ({}ms)",
        result.name,
        result.message,
        result.duration.as_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_maps_health() {
        assert_eq!(classify(HealthStatus::Healthy), (CheckStatus::Pass, None));
        assert_eq!(
            classify(HealthStatus::Degraded("slow".into())),
            (CheckStatus::Warn, Some("slow".into()))
        );
        assert_eq!(classify(HealthStatus::Unhealthy("down".into())).0, CheckStatus::Fail);
    }

    #[test]
    fn plain_render_has_no_escape_codes() {
        let result = CheckResult {
            name: "storage".into(),
            status: CheckStatus::Fail,
            message: "locked".into(),
            duration: Duration::from_millis(7),
        };
        let line = render(&result, false);
        assert!(line.starts_with("✗ storage"));
        assert!(line.ends_with("locked (7ms)"));
        assert!(!line.contains('\u{1b}'));
    }

    #[tokio::test]
    async fn store_check_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RelaydeskConfig::default();
        config.storage.database_path = dir.path().join("check.db").to_string_lossy().into_owned();

        let result = check_store(&config).await;
        assert_eq!(result.status, CheckStatus::Pass, "{}", result.message);
        assert!(result.message.starts_with("0 connection(s)"));
    }
}
