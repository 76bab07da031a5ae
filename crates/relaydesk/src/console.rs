// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the store, the pairing adapter and the orchestrator.

use std::sync::Arc;

use tracing::{info, warn};

use relaydesk_config::RelaydeskConfig;
use relaydesk_core::{ConnectionStore, PluginAdapter, RelaydeskError};
use relaydesk_pairing_http::HttpPairingService;
use relaydesk_session::{ConnectionRegistry, ConnectionSessionOrchestrator, HandshakeTimings};
use relaydesk_storage::SqliteConnectionStore;

/// A fully initialized console backed by SQLite and the HTTP pairing service.
pub struct Console {
    pub orchestrator: ConnectionSessionOrchestrator,
    store: Arc<SqliteConnectionStore>,
}

impl Console {
    pub async fn open(config: &RelaydeskConfig) -> Result<Self, RelaydeskError> {
        let store = Arc::new(SqliteConnectionStore::new(config.storage.clone()));
        store.initialize().await?;

        let registry =
            Arc::new(ConnectionRegistry::open(store.clone(), config.session.status_buffer).await?);
        let pairing = Arc::new(HttpPairingService::new(&config.pairing)?);
        let orchestrator = ConnectionSessionOrchestrator::new(
            registry,
            pairing,
            HandshakeTimings::from(&config.session),
        );

        info!(
            database = %config.storage.database_path,
            pairing = %config.pairing.base_url,
            "console ready"
        );
        Ok(Self {
            orchestrator,
            store,
        })
    }

    /// Cancel live attempts and flush the store.
    pub async fn close(self) {
        self.orchestrator.shutdown().await;
        if let Err(e) = self.store.shutdown().await {
            warn!(error = %e, "store shutdown failed");
        }
    }
}
