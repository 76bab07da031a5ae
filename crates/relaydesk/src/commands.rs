// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `relaydesk connections` and `relaydesk pair` implementations.

use colored::Colorize;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use relaydesk_core::{Connection, ConnectionId, ConnectionSpec, ConnectionStatus, RelaydeskError};
use relaydesk_session::ConnectionSessionOrchestrator;

/// Print every connection as one table row.
pub async fn list_connections(orchestrator: &ConnectionSessionOrchestrator) {
    let connections = orchestrator.list().await;
    if connections.is_empty() {
        println!("no connections configured");
        return;
    }
    for connection in &connections {
        println!("{}", format_row(connection));
    }
}

pub async fn add_connection(
    orchestrator: &ConnectionSessionOrchestrator,
    spec: ConnectionSpec,
) -> Result<(), RelaydeskError> {
    let connection = orchestrator.create(spec).await?;
    println!("created {}", format_row(&connection));
    Ok(())
}

pub async fn remove_connection(
    orchestrator: &ConnectionSessionOrchestrator,
    id: &ConnectionId,
) -> Result<(), RelaydeskError> {
    orchestrator.delete(id).await?;
    println!("removed {id}");
    Ok(())
}

pub async fn set_default(
    orchestrator: &ConnectionSessionOrchestrator,
    id: &ConnectionId,
) -> Result<(), RelaydeskError> {
    let connection = orchestrator.set_default(id).await?;
    println!("default is now {}", format_row(&connection));
    Ok(())
}

/// Run a pairing handshake for `id`, printing the payload and each status
/// change until the connection settles or `shutdown` fires.
pub async fn pair(
    orchestrator: &ConnectionSessionOrchestrator,
    id: &ConnectionId,
    shutdown: &CancellationToken,
) -> Result<(), RelaydeskError> {
    let payload = orchestrator.start(id).await?;
    println!("scan or enter this pairing code:\n\n    {}\n", payload.to_string().bold());

    let connection = follow_pairing(orchestrator, id, shutdown, |status| {
        println!("  status: {}", paint(status));
    })
    .await?;
    println!("{} {}", "connected".green().bold(), connection.display_name);
    Ok(())
}

/// Report status changes of `id` to `on_status` until its attempt resolves.
///
/// Cancelling `shutdown` cancels the attempt and yields `Cancelled`.
pub async fn follow_pairing(
    orchestrator: &ConnectionSessionOrchestrator,
    id: &ConnectionId,
    shutdown: &CancellationToken,
    mut on_status: impl FnMut(ConnectionStatus),
) -> Result<Connection, RelaydeskError> {
    let mut statuses = orchestrator.status_stream(id).await?;
    let outcome = orchestrator.wait_for_outcome(id);
    tokio::pin!(outcome);

    loop {
        tokio::select! {
            result = &mut outcome => return result,
            Some(status) = statuses.next() => on_status(status),
            _ = shutdown.cancelled() => {
                info!(connection_id = %id, "pairing interrupted");
                orchestrator.cancel(id).await?;
                return Err(RelaydeskError::Cancelled {
                    connection_id: id.clone(),
                });
            }
        }
    }
}

fn format_row(connection: &Connection) -> String {
    let mut row = format!(
        "{:<20} {:<24} {:<10} {}",
        connection.id.as_str(),
        connection.display_name,
        connection.platform_type.to_string(),
        paint(connection.status),
    );
    if connection.is_default {
        row.push_str(" (default)");
    }
    if let Some(reason) = &connection.last_error {
        row.push_str(&format!(" [{reason}]"));
    }
    row
}

fn paint(status: ConnectionStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        ConnectionStatus::Connected => label.green(),
        ConnectionStatus::Error => label.red(),
        ConnectionStatus::Connecting | ConnectionStatus::AwaitingConfirmation => label.yellow(),
        ConnectionStatus::Disconnected => label.normal(),
    }
}
