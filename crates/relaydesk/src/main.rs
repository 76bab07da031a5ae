// SPDX-FileCopyrightText: 2026 Relaydesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relaydesk - console for messaging connections and their pairing handshakes.

mod check;
mod commands;
mod console;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use relaydesk_config::RelaydeskConfig;
use relaydesk_core::{ConnectionId, ConnectionSpec, PlatformType, RelaydeskError};

use crate::console::Console;

/// Relaydesk - console for messaging connections and their pairing handshakes.
#[derive(Parser, Debug)]
#[command(name = "relaydesk", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage configured connections.
    Connections {
        #[command(subcommand)]
        action: ConnectionsAction,
    },
    /// Pair a connection and wait until the handshake settles.
    Pair {
        /// Connection id.
        id: String,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConnectionsAction {
    /// List all connections.
    List,
    /// Add a connection.
    Add {
        /// Display name.
        name: String,
        /// Platform: qr-linked, token-based or webhook.
        platform: PlatformType,
        /// Explicit id; generated when omitted.
        #[arg(long)]
        id: Option<String>,
        /// Make this the default connection.
        #[arg(long)]
        default: bool,
    },
    /// Remove a connection, cancelling any pairing in progress.
    Remove { id: String },
    /// Make a connection the default.
    SetDefault { id: String },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Validate configuration and probe the store and pairing service.
    Check {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => relaydesk_config::load_and_validate_path(path),
        None => relaydesk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            relaydesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.console.log_level);

    match run(cli.command, &config).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Execute one subcommand. `Ok(false)` means it ran but reported failure.
async fn run(command: Commands, config: &RelaydeskConfig) -> Result<bool, RelaydeskError> {
    if let Commands::Config {
        action: ConfigAction::Check { plain },
    } = command
    {
        return Ok(check::run_check(config, plain).await);
    }

    let console = Console::open(config).await?;
    let result = match command {
        Commands::Connections { action } => run_connections(&console, action).await,
        Commands::Pair { id } => {
            let shutdown = shutdown::install_signal_handler();
            commands::pair(&console.orchestrator, &ConnectionId(id), &shutdown).await
        }
        Commands::Config { .. } => Ok(()),
    };
    console.close().await;
    result.map(|()| true)
}

async fn run_connections(
    console: &Console,
    action: ConnectionsAction,
) -> Result<(), RelaydeskError> {
    let orchestrator = &console.orchestrator;
    match action {
        ConnectionsAction::List => {
            commands::list_connections(orchestrator).await;
            Ok(())
        }
        ConnectionsAction::Add {
            name,
            platform,
            id,
            default,
        } => {
            let mut spec = ConnectionSpec::new(name, platform);
            if let Some(id) = id {
                spec = spec.with_id(ConnectionId(id));
            }
            if default {
                spec = spec.as_default();
            }
            commands::add_connection(orchestrator, spec).await
        }
        ConnectionsAction::Remove { id } => {
            commands::remove_connection(orchestrator, &ConnectionId(id)).await
        }
        ConnectionsAction::SetDefault { id } => {
            commands::set_default(orchestrator, &ConnectionId(id)).await
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("relaydesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
