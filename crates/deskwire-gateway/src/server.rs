// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the dispatcher.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    middleware as axum_middleware,
    routing::get,
};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::debug;

use deskwire_core::types::HealthStatus;
use deskwire_core::{ChannelGateway, DeskwireError, StorageAdapter};
use deskwire_engine::{PermissionDirectory, PresenceDirectory, PrivateChatRelay, TicketStore};

use crate::auth::{AuthConfig, auth_middleware};
use crate::protocol::ServerEvent;
use crate::ws;

/// Health state for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers and the dispatcher.
#[derive(Clone)]
pub struct GatewayState {
    pub tickets: Arc<TicketStore>,
    pub presence: Arc<PresenceDirectory>,
    pub permissions: Arc<PermissionDirectory>,
    pub private_chat: Arc<PrivateChatRelay>,
    pub storage: Arc<dyn StorageAdapter>,
    pub channel: Arc<dyn ChannelGateway>,
    /// connection id -> outbound event queue for that socket.
    pub sessions: Arc<DashMap<String, mpsc::Sender<ServerEvent>>>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

impl GatewayState {
    /// Best-effort fan-out to every connected session. A full or dead
    /// peer queue is skipped, never awaited.
    pub fn broadcast(&self, event: &ServerEvent) {
        for session in self.sessions.iter() {
            if let Err(e) = session.value().try_send(event.clone()) {
                debug!(connection_id = %session.key(), error = %e, "broadcast skipped for connection");
            }
        }
    }

    /// Best-effort targeted emit to one connection.
    pub fn emit_to(&self, connection_id: &str, event: ServerEvent) {
        if let Some(sender) = self.sessions.get(connection_id) {
            if let Err(e) = sender.try_send(event) {
                debug!(connection_id, error = %e, "targeted emit dropped");
            }
        }
    }

    /// Best-effort targeted emit to a user's live connection, if any.
    pub fn emit_to_user(&self, user_id: &str, event: ServerEvent) {
        if let Some(connection_id) = self.presence.connection_for(user_id) {
            self.emit_to(&connection_id, event);
        }
    }
}

/// Gateway server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
}

/// Unauthenticated liveness endpoint for process supervisors.
async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// Response body for GET /v1/health.
#[derive(Debug, Serialize)]
struct AdapterHealthResponse {
    channel: String,
    storage: String,
}

fn render_health(status: Result<HealthStatus, DeskwireError>) -> String {
    match status {
        Ok(HealthStatus::Healthy) => "healthy".to_string(),
        Ok(HealthStatus::Degraded(reason)) => format!("degraded: {reason}"),
        Ok(HealthStatus::Unhealthy(reason)) => format!("unhealthy: {reason}"),
        Err(e) => format!("unhealthy: {e}"),
    }
}

/// Authenticated adapter-level health detail.
async fn get_adapter_health(State(state): State<GatewayState>) -> Json<AdapterHealthResponse> {
    Json(AdapterHealthResponse {
        channel: render_health(state.channel.health_check().await),
        storage: render_health(state.storage.health_check().await),
    })
}

/// Build the gateway router: public health, authenticated detail, and
/// the WebSocket route (which authenticates during its handshake).
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(get_public_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/health", get(get_adapter_health))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive())
}

/// Start the gateway server, serving until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), DeskwireError> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DeskwireError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| DeskwireError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use deskwire_engine::TokenSigner;
    use deskwire_test_utils::{MockGateway, memory_storage};

    pub(crate) async fn test_state(bearer_token: Option<&str>) -> GatewayState {
        let storage = memory_storage().await;
        GatewayState {
            tickets: Arc::new(TicketStore::new(storage.clone(), "whatsapp")),
            presence: Arc::new(PresenceDirectory::new()),
            permissions: Arc::new(PermissionDirectory::new(
                storage.clone(),
                Some(TokenSigner::new("a-long-enough-test-secret", 60)),
            )),
            private_chat: Arc::new(PrivateChatRelay::new(storage.clone())),
            storage,
            channel: Arc::new(MockGateway::new()),
            sessions: Arc::new(DashMap::new()),
            auth: AuthConfig {
                bearer_token: bearer_token.map(String::from),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
        }
    }

    #[tokio::test]
    async fn state_is_clone_and_broadcast_skips_full_queues() {
        let state = test_state(None).await;
        let (tx, mut rx) = mpsc::channel(1);
        state.sessions.insert("conn-1".into(), tx);

        // Fill the queue, then broadcast twice: the second is skipped,
        // not awaited.
        state.broadcast(&ServerEvent::error("first"));
        state.broadcast(&ServerEvent::error("second"));
        assert_eq!(rx.recv().await, Some(ServerEvent::error("first")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_to_unknown_connection_is_a_no_op() {
        let state = test_state(None).await;
        state.emit_to("ghost", ServerEvent::error("nobody home"));
    }
}
