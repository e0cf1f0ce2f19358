// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket connection lifecycle.
//!
//! Each accepted socket gets a connection id, an outbound event queue,
//! and a seat in the sessions map. The full ticket snapshot is queued
//! before the command loop starts, so a client never observes a
//! `ticketUpdated` without its baseline. Commands are processed
//! sequentially per connection; disconnect and socket error share one
//! cleanup path.

use std::collections::HashMap;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatch;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::server::GatewayState;

/// WebSocket upgrade handler. Auth happens here, before the upgrade,
/// via the `token` query parameter.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(state): State<GatewayState>,
) -> Response {
    if !state.auth.token_matches(params.get("token").map(String::as_str)) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Queue the baseline ticket snapshot, then register the connection for
/// broadcasts. The order matters: a seat in the sessions map makes the
/// queue reachable by broadcasts, so taking it before the snapshot is
/// queued would let a concurrent `ticketUpdated` land ahead of the
/// baseline.
async fn seat_connection(
    state: &GatewayState,
    connection_id: &str,
    tx: mpsc::Sender<ServerEvent>,
) -> bool {
    let snapshot = state.tickets.list_all().await;
    if tx.send(ServerEvent::Tickets(snapshot)).await.is_err() {
        return false;
    }
    state.sessions.insert(connection_id.to_string(), tx);
    true
}

/// Drive one client connection to completion.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(64);
    if !seat_connection(&state, &connection_id, tx).await {
        return;
    }
    debug!(connection_id, "client connected");

    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(frame) => {
                    if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "failed to serialize server event"),
            }
        }
    });

    // Sequential command loop: each command is fully applied before the
    // next frame is read.
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => {
                let frame: &str = &text;
                match serde_json::from_str::<ClientEvent>(frame) {
                    Ok(event) => dispatch::handle_event(&state, &connection_id, event).await,
                    Err(e) => {
                        debug!(connection_id, error = %e, "unparseable client frame");
                        state.emit_to(
                            &connection_id,
                            ServerEvent::error(format!("unrecognized event: {e}")),
                        );
                    }
                }
            }
            Message::Close(_) => break,
            _ => {} // Binary and ping/pong are ignored.
        }
    }

    // Same cleanup path for close and transport error.
    state.sessions.remove(&connection_id);
    dispatch::handle_disconnect(&state, &connection_id);
    sender_task.abort();
    debug!(connection_id, "client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::tests::test_state;
    use deskwire_core::types::{InboundChat, now_timestamp};

    fn inbound(conversation_id: &str, body: &str) -> InboundChat {
        InboundChat {
            conversation_id: conversation_id.into(),
            body: body.into(),
            sender_name: "Customer".into(),
            sender_handle: conversation_id.into(),
            timestamp: now_timestamp(),
        }
    }

    #[tokio::test]
    async fn baseline_snapshot_precedes_any_broadcast() {
        let state = test_state(None).await;
        let t1 = state.tickets.upsert_inbound(&inbound("c1", "Hello")).await;

        // A broadcast racing the handshake must not be observable before
        // the baseline: the seat in the sessions map is taken only after
        // the snapshot is queued.
        state.broadcast(&ServerEvent::TicketUpdated(t1.clone()));

        let (tx, mut rx) = mpsc::channel(64);
        assert!(seat_connection(&state, "conn-1", tx).await);
        state.broadcast(&ServerEvent::TicketUpdated(t1));

        let first = rx.recv().await.unwrap();
        assert!(matches!(&first, ServerEvent::Tickets(tickets) if tickets.len() == 1));
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, ServerEvent::TicketUpdated(_)));
    }

    #[tokio::test]
    async fn seat_fails_when_the_queue_is_gone() {
        let state = test_state(None).await;
        let (tx, rx) = mpsc::channel(64);
        drop(rx);
        assert!(!seat_connection(&state, "conn-1", tx).await);
        assert!(!state.sessions.contains_key("conn-1"));
    }
}
