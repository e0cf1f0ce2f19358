// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission directory with live propagation.
//!
//! Resolution precedence: admin role, then persisted per-user override
//! (a full replacement, never a merge), then the sector default table.
//! Malformed persisted payloads fail closed to the empty set: a desk
//! showing too few buttons beats one showing too many.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use deskwire_core::types::{Permission, Role};
use deskwire_core::{DeskwireError, StorageAdapter};

use crate::token::{CapabilityToken, TokenSigner};

/// Who may do what, resolved live against storage and the in-memory
/// sector table.
pub struct PermissionDirectory {
    sector_defaults: RwLock<HashMap<String, BTreeSet<Permission>>>,
    storage: Arc<dyn StorageAdapter>,
    signer: Option<TokenSigner>,
}

/// Parse a stored permission list, failing closed on malformed payloads.
fn parse_raw(raw: &str, context: &str) -> BTreeSet<Permission> {
    match serde_json::from_str::<BTreeSet<Permission>>(raw) {
        Ok(set) => set,
        Err(e) => {
            error!(context, error = %e, "data integrity: malformed permission payload, failing closed");
            BTreeSet::new()
        }
    }
}

impl PermissionDirectory {
    pub fn new(storage: Arc<dyn StorageAdapter>, signer: Option<TokenSigner>) -> Self {
        Self {
            sector_defaults: RwLock::new(HashMap::new()),
            storage,
            signer,
        }
    }

    /// The full permission set a user currently holds.
    ///
    /// Never errors: lookup failures and malformed payloads resolve to
    /// the empty set.
    pub async fn effective_permissions(&self, user_id: &str) -> BTreeSet<Permission> {
        let user = match self.storage.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return BTreeSet::new(),
            Err(e) => {
                error!(user_id, error = %e, "permission lookup failed, failing closed");
                return BTreeSet::new();
            }
        };

        if user.role == Role::Admin {
            return Permission::all();
        }

        match self.storage.load_user_override(user_id).await {
            Ok(Some(raw)) => return parse_raw(&raw, "user override"),
            Ok(None) => {}
            Err(e) => {
                error!(user_id, error = %e, "override lookup failed, failing closed");
                return BTreeSet::new();
            }
        }

        self.sector_default(&user.sector).await
    }

    /// Current default for a sector, consulting the live table first and
    /// lazily hydrating it from storage.
    pub async fn sector_default(&self, sector: &str) -> BTreeSet<Permission> {
        if let Some(set) = self.sector_defaults.read().await.get(sector) {
            return set.clone();
        }
        match self.storage.load_sector_default(sector).await {
            Ok(Some(raw)) => {
                let set = parse_raw(&raw, "sector default");
                self.sector_defaults
                    .write()
                    .await
                    .insert(sector.to_string(), set.clone());
                set
            }
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                error!(sector, error = %e, "sector default lookup failed, failing closed");
                BTreeSet::new()
            }
        }
    }

    /// Replace a sector's default set, live for every future resolution
    /// in this process and persisted for the next one.
    pub async fn set_sector_default(
        &self,
        sector: &str,
        permissions: BTreeSet<Permission>,
    ) -> Result<(), DeskwireError> {
        let raw = serde_json::to_string(&permissions)
            .map_err(|e| DeskwireError::Internal(format!("serialize permissions: {e}")))?;
        self.storage.save_sector_default(sector, &raw).await?;
        self.sector_defaults
            .write()
            .await
            .insert(sector.to_string(), permissions);
        info!(sector, "sector default permissions replaced");
        Ok(())
    }

    /// Replace a user's override and issue a fresh capability token for
    /// targeted delivery. On storage failure the prior override stays
    /// authoritative and the error propagates.
    pub async fn set_user_override(
        &self,
        user_id: &str,
        permissions: BTreeSet<Permission>,
    ) -> Result<CapabilityToken, DeskwireError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            DeskwireError::Config(
                "auth.token_secret is not configured; permission updates are disabled".into(),
            )
        })?;

        let raw = serde_json::to_string(&permissions)
            .map_err(|e| DeskwireError::Internal(format!("serialize permissions: {e}")))?;
        self.storage.replace_user_override(user_id, &raw).await?;
        info!(user_id, "user permission override replaced");
        signer.issue(user_id, &permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskwire_core::types::UserRecord;
    use deskwire_test_utils::memory_storage;

    fn signer() -> Option<TokenSigner> {
        Some(TokenSigner::new("a-long-enough-test-secret", 60))
    }

    async fn seed_user(storage: &Arc<dyn StorageAdapter>, id: &str, role: Role, sector: &str) {
        storage
            .upsert_user(&UserRecord {
                id: id.into(),
                name: "Someone".into(),
                username: id.into(),
                role,
                sector: sector.into(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn admin_short_circuits_to_full_set() {
        let storage = memory_storage().await;
        seed_user(&storage, "boss", Role::Admin, "TI").await;
        let dir = PermissionDirectory::new(storage, signer());
        assert_eq!(dir.effective_permissions("boss").await, Permission::all());
    }

    #[tokio::test]
    async fn unknown_user_fails_closed() {
        let dir = PermissionDirectory::new(memory_storage().await, signer());
        assert!(dir.effective_permissions("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn sector_default_applies_when_no_override() {
        let storage = memory_storage().await;
        seed_user(&storage, "u1", Role::Agent, "RH").await;
        let dir = PermissionDirectory::new(storage, signer());

        dir.set_sector_default(
            "RH",
            BTreeSet::from([Permission::ViewTickets, Permission::ViewChat]),
        )
        .await
        .unwrap();

        assert_eq!(
            dir.effective_permissions("u1").await,
            BTreeSet::from([Permission::ViewTickets, Permission::ViewChat])
        );
    }

    #[tokio::test]
    async fn override_fully_replaces_sector_default() {
        let storage = memory_storage().await;
        seed_user(&storage, "u1", Role::Agent, "RH").await;
        let dir = PermissionDirectory::new(storage, signer());

        dir.set_sector_default(
            "RH",
            BTreeSet::from([Permission::ViewTickets, Permission::SendMessages]),
        )
        .await
        .unwrap();
        let token = dir
            .set_user_override("u1", BTreeSet::from([Permission::ViewChat]))
            .await
            .unwrap();
        assert!(!token.token.is_empty());

        // Full replacement: nothing from the sector default leaks through.
        assert_eq!(
            dir.effective_permissions("u1").await,
            BTreeSet::from([Permission::ViewChat])
        );
    }

    #[tokio::test]
    async fn malformed_override_fails_closed() {
        let storage = memory_storage().await;
        seed_user(&storage, "u1", Role::Agent, "RH").await;
        storage
            .replace_user_override("u1", "{definitely not json")
            .await
            .unwrap();

        let dir = PermissionDirectory::new(storage, signer());
        dir.set_sector_default("RH", Permission::all()).await.unwrap();
        assert!(dir.effective_permissions("u1").await.is_empty());
    }

    #[tokio::test]
    async fn missing_token_secret_blocks_updates() {
        let storage = memory_storage().await;
        seed_user(&storage, "u1", Role::Agent, "RH").await;
        let dir = PermissionDirectory::new(storage, None);
        assert!(matches!(
            dir.set_user_override("u1", BTreeSet::new()).await,
            Err(DeskwireError::Config(_))
        ));
    }

    #[tokio::test]
    async fn sector_default_hydrates_from_storage() {
        let storage = memory_storage().await;
        seed_user(&storage, "u1", Role::Agent, "RH").await;
        storage
            .save_sector_default("RH", r#"["view_tickets"]"#)
            .await
            .unwrap();

        // A fresh directory has an empty in-memory table and must fall
        // back to the persisted default.
        let dir = PermissionDirectory::new(storage, signer());
        assert_eq!(
            dir.effective_permissions("u1").await,
            BTreeSet::from([Permission::ViewTickets])
        );
    }
}
