// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Private staff-to-staff message relay.

use std::sync::Arc;

use uuid::Uuid;

use deskwire_core::types::{PrivateMessage, now_timestamp};
use deskwire_core::{DeskwireError, StorageAdapter};

/// Relays direct messages between staff identities, independent of
/// tickets and of either party's live connectivity.
pub struct PrivateChatRelay {
    storage: Arc<dyn StorageAdapter>,
}

impl PrivateChatRelay {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Persist a message and return it with the sender's display name
    /// resolved at read time. Persistence failure propagates; the caller
    /// must not emit an unpersisted message.
    pub async fn send(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        content: &str,
    ) -> Result<PrivateMessage, DeskwireError> {
        let message = PrivateMessage {
            id: Uuid::new_v4().to_string(),
            from_user_id: from_user_id.to_string(),
            to_user_id: to_user_id.to_string(),
            content: content.to_string(),
            created_at: now_timestamp(),
            sender_name: None,
        };
        self.storage.save_private_message(&message).await?;

        // Re-read through the name-resolving query.
        match self.storage.get_private_message(&message.id).await? {
            Some(stored) => Ok(stored),
            None => Err(DeskwireError::Integrity(format!(
                "private message {} vanished after save",
                message.id
            ))),
        }
    }

    /// Full pair history, both directions, oldest first. Side-effect free.
    pub async fn history(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessage>, DeskwireError> {
        self.storage.private_history(user_a, user_b).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskwire_core::types::{Role, UserRecord};
    use deskwire_test_utils::memory_storage;

    async fn seed_user(storage: &Arc<dyn StorageAdapter>, id: &str, name: &str) {
        storage
            .upsert_user(&UserRecord {
                id: id.into(),
                name: name.into(),
                username: id.into(),
                role: Role::Agent,
                sector: "TI".into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn send_returns_resolved_sender_name() {
        let storage = memory_storage().await;
        seed_user(&storage, "u1", "Ana").await;
        let relay = PrivateChatRelay::new(storage);

        let message = relay.send("u1", "u2", "lunch?").await.unwrap();
        assert_eq!(message.sender_name.as_deref(), Some("Ana"));
        assert_eq!(message.content, "lunch?");
    }

    #[tokio::test]
    async fn history_interleaves_both_directions() {
        let storage = memory_storage().await;
        seed_user(&storage, "u1", "Ana").await;
        seed_user(&storage, "u2", "Bia").await;
        let relay = PrivateChatRelay::new(storage);

        relay.send("u1", "u2", "one").await.unwrap();
        relay.send("u2", "u1", "two").await.unwrap();
        relay.send("u1", "u2", "three").await.unwrap();

        let history = relay.history("u2", "u1").await.unwrap();
        assert_eq!(
            history.iter().map(|m| m.content.as_str()).collect::<Vec<_>>(),
            vec!["one", "two", "three"]
        );
        assert_eq!(history[1].sender_name.as_deref(), Some("Bia"));
    }
}
