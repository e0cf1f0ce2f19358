// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live staff presence directory.
//!
//! Entries are keyed by user id and survive reconnects: disconnect only
//! clears the connection handle, keeping the last chosen availability
//! status for the next session.

use dashmap::DashMap;
use tracing::debug;

use deskwire_core::types::{AvailabilityStatus, PresenceEntry, Role, now_timestamp};

/// Who is connected right now and how they present themselves.
#[derive(Default)]
pub struct PresenceDirectory {
    by_user: DashMap<String, PresenceEntry>,
    /// Reverse index: connection id -> user id, for disconnect cleanup.
    by_connection: DashMap<String, String>,
}

/// Identity fields announced by a connecting client.
#[derive(Debug, Clone)]
pub struct Announce {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub sector: String,
    pub status: Option<AvailabilityStatus>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection to a user identity.
    ///
    /// Returns true when the directory changed in a way worth
    /// broadcasting. A duplicate announce from the connection a user is
    /// already bound to changes nothing and returns false.
    pub fn register_connection(&self, connection_id: &str, announce: Announce) -> bool {
        let user_id = announce.user_id.clone();
        let mut changed = false;
        self.by_user
            .entry(user_id.clone())
            .and_modify(|entry| {
                let same_handle = entry.connection_id.as_deref() == Some(connection_id);
                entry.name = announce.name.clone();
                entry.role = announce.role;
                entry.sector = announce.sector.clone();
                if let Some(status) = announce.status {
                    changed |= entry.status != Some(status);
                    entry.status = Some(status);
                }
                if !same_handle {
                    entry.connection_id = Some(connection_id.to_string());
                    entry.last_seen = now_timestamp();
                    changed = true;
                }
            })
            .or_insert_with(|| {
                changed = true;
                PresenceEntry {
                    user_id: announce.user_id.clone(),
                    name: announce.name,
                    role: announce.role,
                    sector: announce.sector,
                    status: announce.status,
                    connection_id: Some(connection_id.to_string()),
                    last_seen: now_timestamp(),
                }
            });
        self.by_connection
            .insert(connection_id.to_string(), user_id.clone());
        if changed {
            debug!(user_id = %user_id, connection_id, "presence registered");
        }
        changed
    }

    /// Unbind a connection. The entry and its availability status stay;
    /// returns the affected user id when one was bound.
    pub fn clear_connection(&self, connection_id: &str) -> Option<String> {
        let (_, user_id) = self.by_connection.remove(connection_id)?;
        if let Some(mut entry) = self.by_user.get_mut(&user_id) {
            // Only clear if this connection still owns the handle; a
            // reconnect may already have bound a newer one.
            if entry.connection_id.as_deref() == Some(connection_id) {
                entry.connection_id = None;
                entry.last_seen = now_timestamp();
            }
        }
        Some(user_id)
    }

    /// Update a user's availability. Returns the updated entry, or None
    /// for a user the directory has never seen.
    pub fn set_status(
        &self,
        user_id: &str,
        status: AvailabilityStatus,
    ) -> Option<PresenceEntry> {
        let mut entry = self.by_user.get_mut(user_id)?;
        entry.status = Some(status);
        Some(entry.clone())
    }

    /// Live connection handle for targeted emits, if the user is online.
    pub fn connection_for(&self, user_id: &str) -> Option<String> {
        self.by_user.get(user_id)?.connection_id.clone()
    }

    /// The user a connection announced as, if it announced at all.
    pub fn user_for_connection(&self, connection_id: &str) -> Option<String> {
        self.by_connection
            .get(connection_id)
            .map(|entry| entry.value().clone())
    }

    /// Every known entry, status defaulting to Available.
    pub fn snapshot(&self) -> Vec<PresenceEntry> {
        let mut entries: Vec<PresenceEntry> = self
            .by_user
            .iter()
            .map(|entry| {
                let mut e = entry.clone();
                e.status = Some(e.status.unwrap_or(AvailabilityStatus::Available));
                e
            })
            .collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn announce(user_id: &str) -> Announce {
        Announce {
            user_id: user_id.into(),
            name: "Ana".into(),
            role: Role::Agent,
            sector: "RH".into(),
            status: None,
        }
    }

    #[test]
    fn duplicate_announce_is_not_a_change() {
        let dir = PresenceDirectory::new();
        assert!(dir.register_connection("conn-1", announce("u1")));
        assert!(!dir.register_connection("conn-1", announce("u1")));
        assert_eq!(dir.snapshot().len(), 1);
    }

    #[test]
    fn reconnect_rebinds_handle() {
        let dir = PresenceDirectory::new();
        dir.register_connection("conn-1", announce("u1"));
        assert!(dir.register_connection("conn-2", announce("u1")));
        assert_eq!(dir.connection_for("u1").as_deref(), Some("conn-2"));

        // Late cleanup of the stale connection must not knock the user
        // offline.
        dir.clear_connection("conn-1");
        assert_eq!(dir.connection_for("u1").as_deref(), Some("conn-2"));
    }

    #[test]
    fn disconnect_keeps_entry_and_status() {
        let dir = PresenceDirectory::new();
        dir.register_connection("conn-1", announce("u1"));
        dir.set_status("u1", AvailabilityStatus::Meeting).unwrap();

        assert_eq!(dir.clear_connection("conn-1").as_deref(), Some("u1"));
        let snapshot = dir.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot[0].is_online());
        assert_eq!(snapshot[0].status, Some(AvailabilityStatus::Meeting));
    }

    #[test]
    fn status_for_unknown_user_is_none() {
        let dir = PresenceDirectory::new();
        assert!(dir.set_status("ghost", AvailabilityStatus::Away).is_none());
    }

    #[test]
    fn snapshot_defaults_status_to_available() {
        let dir = PresenceDirectory::new();
        dir.register_connection("conn-1", announce("u1"));
        assert_eq!(dir.snapshot()[0].status, Some(AvailabilityStatus::Available));
    }

    #[test]
    fn clear_unknown_connection_is_none() {
        let dir = PresenceDirectory::new();
        assert!(dir.clear_connection("nope").is_none());
    }
}
