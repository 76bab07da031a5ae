// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry write-through and crash recovery against a real SQLite file.

use std::sync::Arc;

use relaydesk_config::model::StorageConfig;
use relaydesk_core::{ConnectionId, ConnectionStatus, ConnectionStore};
use relaydesk_session::{ConnectionRegistry, DEFAULT_EVENT_BUFFER};
use relaydesk_storage::SqliteConnectionStore;
use relaydesk_test_utils::qr_spec;

async fn open_store(path: &std::path::Path) -> Arc<dyn ConnectionStore> {
    let store = SqliteConnectionStore::new(StorageConfig {
        database_path: path.to_string_lossy().to_string(),
        wal_mode: true,
    });
    store.initialize().await.unwrap();
    Arc::new(store)
}

#[tokio::test]
async fn mutations_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");

    {
        let registry = ConnectionRegistry::open(open_store(&path).await, DEFAULT_EVENT_BUFFER)
            .await
            .unwrap();
        registry.create(qr_spec("a").as_default()).await.unwrap();
        registry.create(qr_spec("b")).await.unwrap();
        registry.create(qr_spec("gone")).await.unwrap();
        registry.set_default(&ConnectionId::from("b")).await.unwrap();
        registry.delete(&ConnectionId::from("gone")).await.unwrap();
        registry
            .apply_status(
                &ConnectionId::from("a"),
                ConnectionStatus::Error,
                Some("rejected".into()),
            )
            .await
            .unwrap();
    }

    let registry = ConnectionRegistry::open(open_store(&path).await, DEFAULT_EVENT_BUFFER)
        .await
        .unwrap();
    let all = registry.list().await;
    assert_eq!(all.len(), 2);
    let a = registry.get(&ConnectionId::from("a")).await.unwrap();
    assert_eq!(a.status, ConnectionStatus::Error);
    assert_eq!(a.last_error.as_deref(), Some("rejected"));
    assert!(!a.is_default);
    assert_eq!(
        registry.default_connection().await.map(|c| c.id),
        Some(ConnectionId::from("b"))
    );
}

#[tokio::test]
async fn interrupted_handshakes_reset_on_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recovery.db");

    {
        let registry = ConnectionRegistry::open(open_store(&path).await, DEFAULT_EVENT_BUFFER)
            .await
            .unwrap();
        registry.create(qr_spec("mid")).await.unwrap();
        registry.create(qr_spec("linked")).await.unwrap();
        let mid = ConnectionId::from("mid");
        registry
            .apply_status(&mid, ConnectionStatus::Connecting, None)
            .await
            .unwrap();
        registry
            .apply_status(&mid, ConnectionStatus::AwaitingConfirmation, None)
            .await
            .unwrap();
        registry
            .apply_status(&ConnectionId::from("linked"), ConnectionStatus::Connected, None)
            .await
            .unwrap();
    }

    let store = open_store(&path).await;
    let registry = ConnectionRegistry::open(store.clone(), DEFAULT_EVENT_BUFFER)
        .await
        .unwrap();
    let mid = registry.get(&ConnectionId::from("mid")).await.unwrap();
    assert_eq!(mid.status, ConnectionStatus::Disconnected);
    assert_eq!(mid.retry_count, 1);
    assert_eq!(
        registry.get(&ConnectionId::from("linked")).await.unwrap().status,
        ConnectionStatus::Connected
    );

    // The reset is written back, not just applied in memory.
    let persisted = store.load_all().await.unwrap();
    assert!(persisted.iter().all(|c| !c.status.is_transient()));
}
