// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the persistence boundary.
//!
//! All operations are idempotent-safe to retry and surface failures as
//! typed errors, never partial silent success. Permission payloads cross
//! this boundary as raw JSON strings; the permission directory owns the
//! fail-closed parsing.

use async_trait::async_trait;

use crate::error::DeskwireError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    CompanyMessage, PrivateMessage, ReactionSet, Ticket, TicketMessage, TicketStatus,
    UserRecord,
};

/// Adapter for the storage and persistence backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, pragmas).
    async fn initialize(&self) -> Result<(), DeskwireError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), DeskwireError>;

    // --- Ticket mirror (best-effort; the in-memory store is authoritative) ---

    /// Creates the ticket row for this instance, or resets it when the
    /// in-memory store started a fresh instance under the same key.
    async fn create_or_get_ticket(&self, ticket: &Ticket) -> Result<(), DeskwireError>;

    /// Appends a message row and touches the ticket's updated_at.
    async fn append_ticket_message(
        &self,
        conversation_id: &str,
        message: &TicketMessage,
    ) -> Result<(), DeskwireError>;

    /// Updates the ticket's status and updated_at in one statement.
    async fn update_ticket_status(
        &self,
        conversation_id: &str,
        status: TicketStatus,
    ) -> Result<(), DeskwireError>;

    // --- Users ---

    async fn upsert_user(&self, user: &UserRecord) -> Result<(), DeskwireError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, DeskwireError>;

    // --- Private messages ---

    async fn save_private_message(&self, message: &PrivateMessage) -> Result<(), DeskwireError>;

    /// Symmetric pair history, created_at ascending. Sender display names
    /// are resolved at read time.
    async fn private_history(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessage>, DeskwireError>;

    /// Loads a single private message with its sender name resolved.
    async fn get_private_message(
        &self,
        message_id: &str,
    ) -> Result<Option<PrivateMessage>, DeskwireError>;

    // --- Company chat & reactions ---

    async fn save_company_message(&self, message: &CompanyMessage) -> Result<(), DeskwireError>;

    /// Toggles the (message, user, emoji) reaction triple and returns the
    /// post-toggle reaction set for the message.
    async fn toggle_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<ReactionSet, DeskwireError>;

    async fn message_reactions(&self, message_id: &str) -> Result<ReactionSet, DeskwireError>;

    // --- Permissions ---

    /// Raw JSON permission list for a sector, if persisted.
    async fn load_sector_default(&self, sector: &str) -> Result<Option<String>, DeskwireError>;

    async fn save_sector_default(&self, sector: &str, raw: &str) -> Result<(), DeskwireError>;

    /// Raw JSON permission list for a user override, if persisted.
    async fn load_user_override(&self, user_id: &str) -> Result<Option<String>, DeskwireError>;

    /// Transactionally replaces the user's override (delete-then-insert in
    /// one transaction). On failure the prior override remains authoritative.
    async fn replace_user_override(&self, user_id: &str, raw: &str) -> Result<(), DeskwireError>;
}
