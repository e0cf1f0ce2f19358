// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw bridge payload normalization.
//!
//! Everything the ticket store must never see is filtered here: group
//! conversations, broadcast traffic, and non-chat events. What survives
//! becomes an [`InboundChat`] keyed by the bare phone identifier.

use serde::Deserialize;

use deskwire_core::types::{InboundChat, now_timestamp};

/// A message event as the bridge sidecar reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeMessage {
    /// Raw JID, e.g. `5511999990000@c.us` or `123-456@g.us`.
    pub from: String,
    #[serde(default)]
    pub body: Option<String>,
    /// Message kind as reported by the bridge (`chat`, `image`, `e2e_notification`, ...).
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    /// Display name the sender advertises.
    #[serde(default, rename = "notifyName")]
    pub notify_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Map a raw bridge message to an inbound chat, or None when it must be
/// filtered before reaching the ticket store.
pub fn normalize(raw: &BridgeMessage) -> Option<InboundChat> {
    // Group chats never become tickets.
    if raw.from.ends_with("@g.us") {
        return None;
    }
    // Status/broadcast traffic is noise.
    if raw.from == "status@broadcast" || raw.from.ends_with("@broadcast") {
        return None;
    }
    // Only plain chat messages carry ticket content.
    if let Some(kind) = raw.kind.as_deref() {
        if kind != "chat" {
            return None;
        }
    }
    let body = raw.body.as_deref()?.trim();
    if body.is_empty() {
        return None;
    }

    let conversation_id = conversation_id(&raw.from);
    Some(InboundChat {
        sender_name: raw
            .notify_name
            .clone()
            .unwrap_or_else(|| conversation_id.clone()),
        sender_handle: conversation_id.clone(),
        conversation_id,
        body: body.to_string(),
        timestamp: raw
            .timestamp
            .and_then(unix_to_rfc3339)
            .unwrap_or_else(now_timestamp),
    })
}

/// Bare conversation key: the JID with its server suffix stripped.
pub fn conversation_id(jid: &str) -> String {
    jid.split_once('@')
        .map(|(user, _)| user.to_string())
        .unwrap_or_else(|| jid.to_string())
}

/// Bridge timestamps are unix seconds; render them in the same RFC 3339
/// shape the rest of the system uses.
fn unix_to_rfc3339(unix_secs: i64) -> Option<String> {
    let datetime = chrono::DateTime::from_timestamp(unix_secs, 0)?;
    Some(datetime.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
}
