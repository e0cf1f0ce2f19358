// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `deskwire serve` command implementation.
//!
//! Starts the full desk: SQLite storage, the in-memory stores, the
//! WhatsApp bridge gateway, the inbound pump, and the realtime
//! WebSocket dispatcher. Supports graceful shutdown via ctrl-c.

use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use deskwire_config::model::DeskConfig;
use deskwire_core::error::DeskwireError;
use deskwire_core::{ChannelGateway, StorageAdapter};
use deskwire_engine::{
    PermissionDirectory, PresenceDirectory, PrivateChatRelay, TicketStore, TokenSigner,
};
use deskwire_gateway::server::{GatewayState, HealthState, ServerConfig};
use deskwire_gateway::{AuthConfig, ServerEvent};
use deskwire_storage::SqliteStorage;
use deskwire_whatsapp::WhatsappGateway;

/// Runs the `deskwire serve` command.
pub async fn run_serve(config: DeskConfig) -> Result<(), DeskwireError> {
    init_tracing(&config.agent.log_level);

    info!("starting deskwire serve");

    // Storage first: everything else hangs off it.
    let storage: Arc<dyn StorageAdapter> = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };

    let signer = config
        .auth
        .token_secret
        .as_ref()
        .map(|secret| TokenSigner::new(secret.clone(), config.auth.token_ttl_secs));
    if signer.is_none() {
        warn!("auth.token_secret not set -- permission updates are disabled");
    }

    let tickets = Arc::new(TicketStore::new(storage.clone(), "whatsapp"));
    let presence = Arc::new(PresenceDirectory::new());
    let permissions = Arc::new(PermissionDirectory::new(storage.clone(), signer));
    let private_chat = Arc::new(PrivateChatRelay::new(storage.clone()));

    // Channel gateway: connect starts the bridge poll loop. Without a
    // bridge URL the desk runs channel-less; sends fail fast and the
    // inbound pump never yields.
    let channel: Arc<dyn ChannelGateway> = if config.whatsapp.bridge_url.is_some() {
        let mut gateway = WhatsappGateway::new(config.whatsapp.clone())?;
        gateway.connect().await?;
        Arc::new(gateway)
    } else {
        warn!("whatsapp.bridge_url not set -- running without an external channel");
        Arc::new(DisabledChannel)
    };

    let cancel = CancellationToken::new();

    let state = GatewayState {
        tickets,
        presence,
        permissions,
        private_chat,
        storage: storage.clone(),
        channel: channel.clone(),
        sessions: Arc::new(DashMap::new()),
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
        },
    };

    // Inbound pump: external chats become tickets become broadcasts.
    {
        let pump_state = state.clone();
        let pump_cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = pump_cancel.cancelled() => break,
                    received = pump_state.channel.receive() => match received {
                        Ok(inbound) => {
                            let ticket = pump_state.tickets.upsert_inbound(&inbound).await;
                            pump_state.broadcast(&ServerEvent::TicketUpdated(ticket));
                        }
                        Err(e) => {
                            warn!(error = %e, "inbound pump stopped");
                            break;
                        }
                    }
                }
            }
        });
    }

    // Ctrl-c flips the cancellation token; the server drains and exits.
    {
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                signal_cancel.cancel();
            }
        });
    }

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    deskwire_gateway::start_server(&server_config, state, cancel).await?;

    // Orderly teardown: stop the bridge loop, checkpoint the database.
    channel.shutdown().await?;
    storage.close().await?;
    info!("deskwire stopped");

    Ok(())
}

/// Stand-in channel used when no bridge is configured. Never becomes
/// ready and never produces inbound traffic.
struct DisabledChannel;

#[async_trait::async_trait]
impl deskwire_core::PluginAdapter for DisabledChannel {
    fn name(&self) -> &str {
        "disabled-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> deskwire_core::types::AdapterType {
        deskwire_core::types::AdapterType::Channel
    }

    async fn health_check(&self) -> Result<deskwire_core::types::HealthStatus, DeskwireError> {
        Ok(deskwire_core::types::HealthStatus::Degraded(
            "no channel configured".into(),
        ))
    }

    async fn shutdown(&self) -> Result<(), DeskwireError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChannelGateway for DisabledChannel {
    async fn connect(&mut self) -> Result<(), DeskwireError> {
        Ok(())
    }

    fn is_ready(&self) -> bool {
        false
    }

    async fn send_message(&self, _: &str, _: &str) -> Result<bool, DeskwireError> {
        Err(DeskwireError::ChannelNotReady)
    }

    async fn receive(&self) -> Result<deskwire_core::types::InboundChat, DeskwireError> {
        std::future::pending().await
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deskwire={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
