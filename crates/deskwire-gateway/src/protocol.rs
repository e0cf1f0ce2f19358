// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed WebSocket protocol.
//!
//! Every frame is `{"event": <name>, "data": <payload>}`. Loosely shaped
//! payloads are rejected at this boundary before they can reach a store;
//! the dispatcher answers an unparseable frame with `messageError`.

use serde::{Deserialize, Serialize};

use deskwire_core::types::{
    AvailabilityStatus, Permission, PresenceEntry, PrivateMessage, ReactionSet, Role, Ticket,
};
use deskwire_engine::CapabilityToken;

/// Commands a desk client may issue.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Announce the staff identity behind this connection.
    #[serde(rename = "userConnected")]
    UserConnected {
        #[serde(rename = "userId")]
        user_id: String,
        name: String,
        role: Role,
        sector: String,
        #[serde(default)]
        status: Option<AvailabilityStatus>,
    },
    #[serde(rename = "updateStatus")]
    UpdateStatus { status: AvailabilityStatus },
    /// Operator reply into an external conversation.
    #[serde(rename = "sendMessage")]
    SendMessage {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        content: String,
    },
    #[serde(rename = "resolveTicket")]
    ResolveTicket {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    /// Open a private thread: the dispatcher answers with its history.
    #[serde(rename = "startPrivateChat")]
    StartPrivateChat {
        #[serde(rename = "toUserId")]
        to_user_id: String,
    },
    #[serde(rename = "sendPrivateMessage")]
    SendPrivateMessage {
        #[serde(rename = "toUserId")]
        to_user_id: String,
        content: String,
    },
    #[serde(rename = "getPrivateChatHistory")]
    GetPrivateChatHistory {
        #[serde(rename = "withUserId")]
        with_user_id: String,
    },
    #[serde(rename = "addReaction")]
    AddReaction {
        #[serde(rename = "messageId")]
        message_id: String,
        emoji: String,
    },
    #[serde(rename = "requestUserPermissions")]
    RequestUserPermissions {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Admin command: replace a user's permission override.
    #[serde(rename = "updateUserPermissions")]
    UpdateUserPermissions {
        #[serde(rename = "userId")]
        user_id: String,
        permissions: Vec<Permission>,
    },
    /// Admin command: replace a sector's default permission set.
    #[serde(rename = "updateSectorPermissions")]
    UpdateSectorPermissions {
        sector: String,
        permissions: Vec<Permission>,
    },
}

/// Presence entry as it crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub sector: String,
    pub status: AvailabilityStatus,
    pub online: bool,
}

impl From<PresenceEntry> for PresenceInfo {
    fn from(entry: PresenceEntry) -> Self {
        Self {
            online: entry.is_online(),
            user_id: entry.user_id,
            name: entry.name,
            role: entry.role,
            sector: entry.sector,
            status: entry.status.unwrap_or(AvailabilityStatus::Available),
        }
    }
}

/// Events the dispatcher emits to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full snapshot, sent once per connection before anything else.
    #[serde(rename = "tickets")]
    Tickets(Vec<Ticket>),
    /// Single post-mutation ticket state, broadcast.
    #[serde(rename = "ticketUpdated")]
    TicketUpdated(Ticket),
    #[serde(rename = "onlineUsers")]
    OnlineUsers(Vec<PresenceInfo>),
    /// Targeted delivery to the two parties of a private thread.
    #[serde(rename = "newPrivateMessage")]
    NewPrivateMessage(PrivateMessage),
    #[serde(rename = "privateChatHistory")]
    PrivateChatHistory {
        #[serde(rename = "withUserId")]
        with_user_id: String,
        messages: Vec<PrivateMessage>,
    },
    #[serde(rename = "messageReacted")]
    MessageReacted {
        #[serde(rename = "messageId")]
        message_id: String,
        reactions: ReactionSet,
    },
    #[serde(rename = "userPermissionsUpdated")]
    UserPermissionsUpdated {
        #[serde(rename = "userId")]
        user_id: String,
        permissions: Vec<Permission>,
        /// Present only on the targeted delivery to the affected user.
        #[serde(skip_serializing_if = "Option::is_none")]
        token: Option<CapabilityToken>,
    },
    /// Generic failure notice carrying a human-readable reason.
    #[serde(rename = "messageError")]
    MessageError { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::MessageError {
            message: message.into(),
        }
    }
}
