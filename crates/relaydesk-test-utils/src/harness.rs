// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness assembling a registry, a mock pairing service, and an
//! orchestrator, optionally backed by a temp SQLite database.

use std::sync::Arc;
use std::time::Duration;

use relaydesk_config::model::StorageConfig;
use relaydesk_core::{
    ConnectionId, ConnectionSpec, ConnectionStore, PairingService, PlatformType, RelaydeskError,
};
use relaydesk_session::{
    ConnectionRegistry, ConnectionSessionOrchestrator, HandshakeTimings, DEFAULT_EVENT_BUFFER,
};
use relaydesk_storage::SqliteConnectionStore;

use crate::mock_pairing::MockPairingService;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    connections: Vec<ConnectionSpec>,
    timings: HandshakeTimings,
    sqlite: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            connections: Vec::new(),
            timings: HandshakeTimings::default(),
            sqlite: false,
        }
    }

    /// Pre-create a connection.
    pub fn with_connection(mut self, spec: ConnectionSpec) -> Self {
        self.connections.push(spec);
        self
    }

    /// Pre-create a QR-linked connection with the given id.
    pub fn with_qr_connection(self, id: &str) -> Self {
        self.with_connection(qr_spec(id))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.timings.poll_interval = interval;
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.timings.handshake_timeout = timeout;
        self
    }

    /// Persist the registry in a temp SQLite database.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    pub async fn build(self) -> Result<TestHarness, RelaydeskError> {
        let (registry, temp_dir) = if self.sqlite {
            let temp_dir = tempfile::TempDir::new()
                .map_err(|e| RelaydeskError::Storage { source: e.into() })?;
            let config = StorageConfig {
                database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
                wal_mode: true,
            };
            let store = SqliteConnectionStore::new(config);
            store.initialize().await?;
            let store: Arc<dyn ConnectionStore> = Arc::new(store);
            (
                ConnectionRegistry::open(store, DEFAULT_EVENT_BUFFER).await?,
                Some(temp_dir),
            )
        } else {
            (ConnectionRegistry::in_memory(DEFAULT_EVENT_BUFFER), None)
        };
        let registry = Arc::new(registry);

        for spec in self.connections {
            registry.create(spec).await?;
        }

        let pairing = MockPairingService::new();
        tracing::debug!(
            sqlite = temp_dir.is_some(),
            poll_interval = ?self.timings.poll_interval,
            "test harness ready"
        );
        let orchestrator = ConnectionSessionOrchestrator::new(
            registry.clone(),
            Arc::new(pairing.clone()) as Arc<dyn PairingService>,
            self.timings,
        );

        Ok(TestHarness {
            orchestrator,
            registry,
            pairing,
            _temp_dir: temp_dir,
        })
    }
}

/// A session stack wired to a [`MockPairingService`].
pub struct TestHarness {
    pub orchestrator: ConnectionSessionOrchestrator,
    pub registry: Arc<ConnectionRegistry>,
    /// Shares its script and call log with the service the orchestrator uses.
    pub pairing: MockPairingService,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Current status of `id`. Panics if the connection is missing.
    pub async fn status_of(&self, id: &str) -> relaydesk_core::ConnectionStatus {
        self.registry
            .get(&ConnectionId::from(id))
            .await
            .map(|c| c.status)
            .unwrap_or_else(|e| panic!("status_of({id}): {e}"))
    }
}

/// A QR-linked connection spec with a fixed id.
pub fn qr_spec(id: &str) -> ConnectionSpec {
    ConnectionSpec::new(format!("Line {id}"), PlatformType::QrLinked).with_id(id)
}
