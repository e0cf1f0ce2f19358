// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Deskwire workspace.
//!
//! Tickets and their messages are owned by the in-memory ticket store;
//! everything here is the plain data that crosses crate boundaries.
//! All timestamps are RFC 3339 strings.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Current UTC time as a millisecond-precision RFC 3339 string, matching
/// the format SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` produces.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum AdapterType {
    Channel,
    Storage,
}

/// Lifecycle status of a ticket instance. `Resolved` is terminal for the
/// instance; a new inbound message for the same conversation id starts a
/// fresh `Open` instance under the same key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TicketStatus {
    Open,
    Resolved,
}

/// Who authored a ticket message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub name: String,
    pub username: String,
    pub is_operator: bool,
}

/// A single message within a ticket. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    /// Originating platform tag (e.g. "whatsapp", "desk").
    pub platform: String,
    pub timestamp: String,
}

/// One open-or-resolved case representing an external conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// The external conversation id, stable across reopen cycles.
    pub id: String,
    pub status: TicketStatus,
    /// Append-only within this instance's lifetime.
    pub messages: Vec<TicketMessage>,
    pub created_at: String,
    pub updated_at: String,
}

impl Ticket {
    /// A fresh open instance for the given conversation id.
    pub fn new(id: String) -> Self {
        let now = now_timestamp();
        Self {
            id,
            status: TicketStatus::Open,
            messages: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// A normalized inbound chat event emitted by a channel gateway.
///
/// Group conversations, broadcast messages, and status updates are filtered
/// out by the gateway before this type is ever constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundChat {
    pub conversation_id: String,
    pub body: String,
    pub sender_name: String,
    pub sender_handle: String,
    pub timestamp: String,
}

/// Staff availability as shown in the presence directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AvailabilityStatus {
    Available,
    Away,
    Meeting,
}

/// A staff member's live connectivity and availability.
///
/// The entry is keyed by user id and survives reconnects; only the
/// connection id is cleared on disconnect. `online` semantics are derived
/// as "connection id present".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceEntry {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub sector: String,
    pub status: Option<AvailabilityStatus>,
    pub connection_id: Option<String>,
    pub last_seen: String,
}

impl PresenceEntry {
    /// A user is online while a live connection handle is recorded.
    pub fn is_online(&self) -> bool {
        self.connection_id.is_some()
    }
}

/// Staff role. Admins short-circuit to the full permission set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Agent,
}

/// A capability a staff member may hold.
///
/// Resolution precedence: admin role, then per-user override (full
/// replacement), then sector default.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    ViewTickets,
    SendMessages,
    ResolveTickets,
    ViewChat,
    SendPrivateMessages,
    AddReactions,
    ManagePermissions,
    ViewReports,
}

impl Permission {
    /// The full capability set granted to admins.
    pub fn all() -> BTreeSet<Permission> {
        Permission::iter().collect()
    }
}

/// A staff member as persisted by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub username: String,
    pub role: Role,
    pub sector: String,
}

/// A direct message between two staff identities, independent of tickets.
///
/// `sender_name` is resolved at read time so later display-name changes
/// reflect in historic reads; it is never cached at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessage {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub sender_name: Option<String>,
}

/// A message in the internal company chat, owned by the persistence boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyMessage {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: String,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
}

/// Reactions on a company message: emoji -> set of reacting user ids.
///
/// At most one reaction per (user, emoji, message); toggling is
/// symmetric-difference, not accumulation.
pub type ReactionSet = BTreeMap<String, BTreeSet<String>>;
