// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client command dispatch.
//!
//! Translates typed client events into store operations and turns every
//! failure into a `messageError` for the originating connection; one
//! connection's failure never leaks to another. All broadcast payloads
//! derive from post-mutation store state.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use deskwire_core::DeskwireError;
use deskwire_core::types::{Permission, Sender, UserRecord};
use deskwire_engine::Announce;

use crate::protocol::{ClientEvent, PresenceInfo, ServerEvent};
use crate::server::GatewayState;

/// Current presence roster as a wire payload.
fn online_users(state: &GatewayState) -> ServerEvent {
    ServerEvent::OnlineUsers(
        state
            .presence
            .snapshot()
            .into_iter()
            .map(PresenceInfo::from)
            .collect(),
    )
}

/// The user this connection announced as, or a `messageError` if it
/// never did.
fn identity(state: &GatewayState, connection_id: &str) -> Option<String> {
    let user_id = state.presence.user_for_connection(connection_id);
    if user_id.is_none() {
        state.emit_to(
            connection_id,
            ServerEvent::error("no identity announced on this connection"),
        );
    }
    user_id
}

/// Check one capability, answering `messageError` when it is missing.
async fn require(
    state: &GatewayState,
    connection_id: &str,
    user_id: &str,
    permission: Permission,
) -> bool {
    let held = state
        .permissions
        .effective_permissions(user_id)
        .await
        .contains(&permission);
    if !held {
        debug!(user_id, %permission, "command denied");
        state.emit_to(
            connection_id,
            ServerEvent::error(format!("permission denied: {permission}")),
        );
    }
    held
}

fn report(state: &GatewayState, connection_id: &str, error: DeskwireError) {
    state.emit_to(connection_id, ServerEvent::error(error.to_string()));
}

/// Apply one client command. Runs to completion before the connection
/// reads its next frame.
pub async fn handle_event(state: &GatewayState, connection_id: &str, event: ClientEvent) {
    match event {
        ClientEvent::UserConnected {
            user_id,
            name,
            role,
            sector,
            status,
        } => {
            // Keep the durable user directory in step with announcements.
            if let Err(e) = state
                .storage
                .upsert_user(&UserRecord {
                    id: user_id.clone(),
                    name: name.clone(),
                    username: user_id.clone(),
                    role,
                    sector: sector.clone(),
                })
                .await
            {
                warn!(user_id, error = %e, "user directory upsert failed");
            }

            let changed = state.presence.register_connection(
                connection_id,
                Announce {
                    user_id,
                    name,
                    role,
                    sector,
                    status,
                },
            );
            if changed {
                state.broadcast(&online_users(state));
            }
        }

        ClientEvent::UpdateStatus { status } => {
            let Some(user_id) = identity(state, connection_id) else {
                return;
            };
            if state.presence.set_status(&user_id, status).is_some() {
                state.broadcast(&online_users(state));
            }
        }

        ClientEvent::SendMessage {
            conversation_id,
            content,
        } => {
            let Some(user_id) = identity(state, connection_id) else {
                return;
            };
            if !require(state, connection_id, &user_id, Permission::SendMessages).await {
                return;
            }
            let sender = operator_sender(state, &user_id).await;
            match state
                .tickets
                .send_outbound(&conversation_id, &content, sender, state.channel.as_ref())
                .await
            {
                Ok(ticket) => state.broadcast(&ServerEvent::TicketUpdated(ticket)),
                Err(e) => report(state, connection_id, e),
            }
        }

        ClientEvent::ResolveTicket { conversation_id } => {
            let Some(user_id) = identity(state, connection_id) else {
                return;
            };
            if !require(state, connection_id, &user_id, Permission::ResolveTickets).await {
                return;
            }
            // Resolving an unknown conversation is benign.
            if let Some(ticket) = state.tickets.resolve(&conversation_id).await {
                state.broadcast(&ServerEvent::TicketUpdated(ticket));
            } else {
                debug!(conversation_id, "resolve on unknown conversation ignored");
            }
        }

        ClientEvent::StartPrivateChat { to_user_id }
        | ClientEvent::GetPrivateChatHistory {
            with_user_id: to_user_id,
        } => {
            let Some(user_id) = identity(state, connection_id) else {
                return;
            };
            match state.private_chat.history(&user_id, &to_user_id).await {
                Ok(messages) => state.emit_to(
                    connection_id,
                    ServerEvent::PrivateChatHistory {
                        with_user_id: to_user_id,
                        messages,
                    },
                ),
                Err(e) => report(state, connection_id, e),
            }
        }

        ClientEvent::SendPrivateMessage {
            to_user_id,
            content,
        } => {
            let Some(user_id) = identity(state, connection_id) else {
                return;
            };
            if !require(state, connection_id, &user_id, Permission::SendPrivateMessages).await {
                return;
            }
            match state.private_chat.send(&user_id, &to_user_id, &content).await {
                Ok(message) => {
                    // Targeted delivery to both parties, never a broadcast.
                    state.emit_to_user(
                        &to_user_id,
                        ServerEvent::NewPrivateMessage(message.clone()),
                    );
                    state.emit_to(connection_id, ServerEvent::NewPrivateMessage(message));
                }
                Err(e) => report(state, connection_id, e),
            }
        }

        ClientEvent::AddReaction { message_id, emoji } => {
            let Some(user_id) = identity(state, connection_id) else {
                return;
            };
            if !require(state, connection_id, &user_id, Permission::AddReactions).await {
                return;
            }
            match state
                .storage
                .toggle_reaction(&message_id, &user_id, &emoji)
                .await
            {
                Ok(reactions) => state.broadcast(&ServerEvent::MessageReacted {
                    message_id,
                    reactions,
                }),
                Err(e) => report(state, connection_id, e),
            }
        }

        ClientEvent::RequestUserPermissions { user_id } => {
            let permissions = state.permissions.effective_permissions(&user_id).await;
            state.emit_to(
                connection_id,
                ServerEvent::UserPermissionsUpdated {
                    user_id,
                    permissions: permissions.into_iter().collect(),
                    token: None,
                },
            );
        }

        ClientEvent::UpdateUserPermissions {
            user_id,
            permissions,
        } => {
            let Some(actor) = identity(state, connection_id) else {
                return;
            };
            if !require(state, connection_id, &actor, Permission::ManagePermissions).await {
                return;
            }
            let set: BTreeSet<Permission> = permissions.into_iter().collect();
            match state.permissions.set_user_override(&user_id, set.clone()).await {
                Ok(token) => {
                    // Exactly the affected user's live connection learns
                    // of the change, token included.
                    state.emit_to_user(
                        &user_id,
                        ServerEvent::UserPermissionsUpdated {
                            user_id: user_id.clone(),
                            permissions: set.into_iter().collect(),
                            token: Some(token),
                        },
                    );
                }
                Err(e) => report(state, connection_id, e),
            }
        }

        ClientEvent::UpdateSectorPermissions {
            sector,
            permissions,
        } => {
            let Some(actor) = identity(state, connection_id) else {
                return;
            };
            if !require(state, connection_id, &actor, Permission::ManagePermissions).await {
                return;
            }
            let set: BTreeSet<Permission> = permissions.into_iter().collect();
            if let Err(e) = state.permissions.set_sector_default(&sector, set).await {
                report(state, connection_id, e);
                return;
            }
            // Live propagation: every online member of the sector learns
            // their freshly resolved set.
            for entry in state.presence.snapshot() {
                if entry.sector != sector || !entry.is_online() {
                    continue;
                }
                let effective = state
                    .permissions
                    .effective_permissions(&entry.user_id)
                    .await;
                state.emit_to_user(
                    &entry.user_id,
                    ServerEvent::UserPermissionsUpdated {
                        user_id: entry.user_id.clone(),
                        permissions: effective.into_iter().collect(),
                        token: None,
                    },
                );
            }
        }
    }
}

/// Cleanup shared by socket close and transport error.
pub fn handle_disconnect(state: &GatewayState, connection_id: &str) {
    if let Some(user_id) = state.presence.clear_connection(connection_id) {
        debug!(connection_id, user_id, "presence handle cleared");
        state.broadcast(&online_users(state));
    }
}

/// Sender identity for outbound ticket messages, preferring the durable
/// user record over the announce.
async fn operator_sender(state: &GatewayState, user_id: &str) -> Sender {
    match state.storage.get_user(user_id).await {
        Ok(Some(user)) => Sender {
            name: user.name,
            username: user.username,
            is_operator: true,
        },
        _ => Sender {
            name: user_id.to_string(),
            username: user_id.to_string(),
            is_operator: true,
        },
    }
}
