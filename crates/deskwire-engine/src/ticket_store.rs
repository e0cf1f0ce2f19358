// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative in-memory ticket store.
//!
//! One async Mutex per conversation key serializes all mutations of that
//! ticket while leaving unrelated conversations fully concurrent. The
//! SQLite mirror is best-effort: a failed write is logged and never
//! surfaces on the broadcast path.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use deskwire_core::types::{
    InboundChat, Sender, Ticket, TicketMessage, TicketStatus, now_timestamp,
};
use deskwire_core::{ChannelGateway, DeskwireError, StorageAdapter};

/// In-memory ticket registry keyed by external conversation id.
pub struct TicketStore {
    tickets: DashMap<String, Arc<Mutex<Ticket>>>,
    /// Keys in first-creation order. A key re-created after resolve keeps
    /// its original position.
    order: Mutex<Vec<String>>,
    storage: Arc<dyn StorageAdapter>,
    /// Platform tag stamped on every message of this store's tickets.
    platform: String,
}

impl TicketStore {
    pub fn new(storage: Arc<dyn StorageAdapter>, platform: impl Into<String>) -> Self {
        Self {
            tickets: DashMap::new(),
            order: Mutex::new(Vec::new()),
            storage,
            platform: platform.into(),
        }
    }

    /// Get the per-key cell, creating a fresh open ticket when the key is
    /// unknown. Returns the cell plus whether it was just created.
    async fn cell_for(&self, conversation_id: &str) -> (Arc<Mutex<Ticket>>, bool) {
        let created;
        let cell = match self.tickets.entry(conversation_id.to_string()) {
            Entry::Occupied(occupied) => {
                created = false;
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                created = true;
                let cell = Arc::new(Mutex::new(Ticket::new(conversation_id.to_string())));
                vacant.insert(cell.clone());
                cell
            }
        };
        if created {
            self.order.lock().await.push(conversation_id.to_string());
        }
        (cell, created)
    }

    async fn mirror_create(&self, ticket: &Ticket) {
        if let Err(e) = self.storage.create_or_get_ticket(ticket).await {
            warn!(conversation_id = %ticket.id, error = %e, "ticket mirror create failed");
        }
    }

    async fn mirror_append(&self, conversation_id: &str, message: &TicketMessage) {
        if let Err(e) = self.storage.append_ticket_message(conversation_id, message).await {
            warn!(conversation_id, error = %e, "ticket mirror append failed");
        }
    }

    /// Route an inbound chat event into its ticket.
    ///
    /// Creates a fresh open instance when the key is unknown or the
    /// existing instance is resolved (the old history is superseded, not
    /// merged). Returns a post-mutation snapshot.
    pub async fn upsert_inbound(&self, inbound: &InboundChat) -> Ticket {
        let (cell, created) = self.cell_for(&inbound.conversation_id).await;
        let mut ticket = cell.lock().await;

        let mut fresh_instance = created;
        if ticket.status == TicketStatus::Resolved {
            // Reopen under the same key: fresh instance, original position.
            *ticket = Ticket::new(inbound.conversation_id.clone());
            fresh_instance = true;
        }
        if fresh_instance {
            debug!(conversation_id = %inbound.conversation_id, "ticket instance created");
            self.mirror_create(&ticket).await;
        }

        let message = TicketMessage {
            id: Uuid::new_v4().to_string(),
            content: inbound.body.clone(),
            sender: Sender {
                name: inbound.sender_name.clone(),
                username: inbound.sender_handle.clone(),
                is_operator: false,
            },
            platform: self.platform.clone(),
            timestamp: inbound.timestamp.clone(),
        };
        ticket.messages.push(message.clone());
        ticket.updated_at = now_timestamp();
        self.mirror_append(&inbound.conversation_id, &message).await;

        ticket.clone()
    }

    /// Send an operator message out through the channel and record it.
    ///
    /// The external send happens first, while the per-key lock is held: the
    /// message is appended only after the channel confirms acceptance, so a
    /// rejected or timed-out send leaves the ticket untouched. Ticket
    /// creation itself is independent of gateway readiness.
    pub async fn send_outbound(
        &self,
        conversation_id: &str,
        content: &str,
        sender: Sender,
        channel: &dyn ChannelGateway,
    ) -> Result<Ticket, DeskwireError> {
        let (cell, created) = self.cell_for(conversation_id).await;
        let mut ticket = cell.lock().await;
        if created {
            self.mirror_create(&ticket).await;
        }

        if !channel.is_ready() {
            return Err(DeskwireError::ChannelNotReady);
        }
        let accepted = channel.send_message(conversation_id, content).await?;
        if !accepted {
            return Err(DeskwireError::Channel {
                message: format!("send to {conversation_id} rejected by channel"),
                source: None,
            });
        }

        let message = TicketMessage {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            sender,
            platform: self.platform.clone(),
            timestamp: now_timestamp(),
        };
        ticket.messages.push(message.clone());
        ticket.updated_at = now_timestamp();
        self.mirror_append(conversation_id, &message).await;

        Ok(ticket.clone())
    }

    /// Mark a ticket resolved. Missing key returns None (benign);
    /// already-resolved is a no-op returning current state.
    pub async fn resolve(&self, conversation_id: &str) -> Option<Ticket> {
        let cell = self.tickets.get(conversation_id)?.clone();
        let mut ticket = cell.lock().await;
        if ticket.status == TicketStatus::Open {
            ticket.status = TicketStatus::Resolved;
            ticket.updated_at = now_timestamp();
            if let Err(e) = self
                .storage
                .update_ticket_status(conversation_id, TicketStatus::Resolved)
                .await
            {
                warn!(conversation_id, error = %e, "ticket mirror status update failed");
            }
        }
        Some(ticket.clone())
    }

    /// Snapshot of a single ticket.
    pub async fn get(&self, conversation_id: &str) -> Option<Ticket> {
        let cell = self.tickets.get(conversation_id)?.clone();
        let ticket = cell.lock().await;
        Some(ticket.clone())
    }

    /// Snapshot of every ticket in first-creation insertion order.
    pub async fn list_all(&self) -> Vec<Ticket> {
        let order = self.order.lock().await.clone();
        let mut snapshot = Vec::with_capacity(order.len());
        for key in order {
            if let Some(cell) = self.tickets.get(&key).map(|c| c.clone()) {
                snapshot.push(cell.lock().await.clone());
            }
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskwire_test_utils::{MockGateway, memory_storage};

    fn inbound(conversation_id: &str, body: &str) -> InboundChat {
        InboundChat {
            conversation_id: conversation_id.into(),
            body: body.into(),
            sender_name: "Customer".into(),
            sender_handle: conversation_id.into(),
            timestamp: now_timestamp(),
        }
    }

    fn operator() -> Sender {
        Sender {
            name: "Ana".into(),
            username: "ana".into(),
            is_operator: true,
        }
    }

    #[tokio::test]
    async fn inbound_creates_then_appends() {
        let store = TicketStore::new(memory_storage().await, "whatsapp");
        let first = store.upsert_inbound(&inbound("5511999990000", "Hello")).await;
        assert_eq!(first.status, TicketStatus::Open);
        assert_eq!(first.messages.len(), 1);

        let second = store.upsert_inbound(&inbound("5511999990000", "Anyone there?")).await;
        assert_eq!(second.messages.len(), 2);
        assert_eq!(store.list_all().await.len(), 1);
    }

    #[tokio::test]
    async fn reopen_supersedes_history_and_keeps_position() {
        let store = TicketStore::new(memory_storage().await, "whatsapp");
        store.upsert_inbound(&inbound("5511999990000", "Hello")).await;
        store.upsert_inbound(&inbound("5511888880000", "Hi")).await;

        let resolved = store.resolve("5511999990000").await.unwrap();
        assert_eq!(resolved.status, TicketStatus::Resolved);

        let reopened = store.upsert_inbound(&inbound("5511999990000", "Still there?")).await;
        assert_eq!(reopened.status, TicketStatus::Open);
        assert_eq!(reopened.messages.len(), 1);
        assert_eq!(reopened.messages[0].content, "Still there?");

        let all = store.list_all().await;
        assert_eq!(
            all.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["5511999990000", "5511888880000"]
        );
    }

    #[tokio::test]
    async fn resolve_missing_is_benign_and_repeat_is_noop() {
        let store = TicketStore::new(memory_storage().await, "whatsapp");
        assert!(store.resolve("nobody").await.is_none());

        store.upsert_inbound(&inbound("c1", "hi")).await;
        let first = store.resolve("c1").await.unwrap();
        let second = store.resolve("c1").await.unwrap();
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn outbound_records_only_on_confirmed_send() {
        let store = TicketStore::new(memory_storage().await, "whatsapp");
        let gateway = MockGateway::new();
        gateway.set_ready(true);

        let ticket = store
            .send_outbound("c1", "How can I help?", operator(), &gateway)
            .await
            .unwrap();
        assert_eq!(ticket.messages.len(), 1);
        assert!(ticket.messages[0].sender.is_operator);
        assert_eq!(gateway.sent().await, vec![("c1".to_string(), "How can I help?".to_string())]);
    }

    #[tokio::test]
    async fn outbound_on_not_ready_gateway_fails_without_append() {
        let store = TicketStore::new(memory_storage().await, "whatsapp");
        let gateway = MockGateway::new();
        gateway.set_ready(false);

        let err = store
            .send_outbound("c1", "hello?", operator(), &gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, DeskwireError::ChannelNotReady));

        // Ticket creation is independent of readiness, but nothing recorded.
        let ticket = store.get("c1").await.unwrap();
        assert!(ticket.messages.is_empty());
    }

    #[tokio::test]
    async fn rejected_send_leaves_ticket_untouched() {
        let store = TicketStore::new(memory_storage().await, "whatsapp");
        let gateway = MockGateway::new();
        gateway.set_ready(true);
        gateway.reject_next_send();

        store.upsert_inbound(&inbound("c1", "hi")).await;
        let err = store
            .send_outbound("c1", "reply", operator(), &gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, DeskwireError::Channel { .. }));
        assert_eq!(store.get("c1").await.unwrap().messages.len(), 1);
    }
}
