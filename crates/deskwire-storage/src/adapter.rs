// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use deskwire_config::model::StorageConfig;
use deskwire_core::types::{
    CompanyMessage, PrivateMessage, ReactionSet, Ticket, TicketMessage, TicketStatus,
    UserRecord,
};
use deskwire_core::{AdapterType, DeskwireError, HealthStatus, PluginAdapter, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    fn db(&self) -> Result<&Database, DeskwireError> {
        self.db.get().ok_or_else(|| DeskwireError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, DeskwireError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), DeskwireError> {
        // Shutdown delegates to close if the DB was initialized.
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), DeskwireError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| DeskwireError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), DeskwireError> {
        self.db()?.close().await
    }

    // --- Ticket mirror ---

    async fn create_or_get_ticket(&self, ticket: &Ticket) -> Result<(), DeskwireError> {
        queries::tickets::upsert_ticket(self.db()?, ticket).await
    }

    async fn append_ticket_message(
        &self,
        conversation_id: &str,
        message: &TicketMessage,
    ) -> Result<(), DeskwireError> {
        queries::tickets::append_message(self.db()?, conversation_id, message).await
    }

    async fn update_ticket_status(
        &self,
        conversation_id: &str,
        status: TicketStatus,
    ) -> Result<(), DeskwireError> {
        queries::tickets::update_status(self.db()?, conversation_id, status).await
    }

    // --- Users ---

    async fn upsert_user(&self, user: &UserRecord) -> Result<(), DeskwireError> {
        queries::users::upsert_user(self.db()?, user).await
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserRecord>, DeskwireError> {
        queries::users::get_user(self.db()?, user_id).await
    }

    // --- Private messages ---

    async fn save_private_message(&self, message: &PrivateMessage) -> Result<(), DeskwireError> {
        queries::private_messages::save_private_message(self.db()?, message).await
    }

    async fn private_history(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessage>, DeskwireError> {
        queries::private_messages::private_history(self.db()?, user_a, user_b).await
    }

    async fn get_private_message(
        &self,
        message_id: &str,
    ) -> Result<Option<PrivateMessage>, DeskwireError> {
        queries::private_messages::get_private_message(self.db()?, message_id).await
    }

    // --- Company chat & reactions ---

    async fn save_company_message(&self, message: &CompanyMessage) -> Result<(), DeskwireError> {
        queries::company::save_company_message(self.db()?, message).await
    }

    async fn toggle_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<ReactionSet, DeskwireError> {
        queries::company::toggle_reaction(self.db()?, message_id, user_id, emoji).await
    }

    async fn message_reactions(&self, message_id: &str) -> Result<ReactionSet, DeskwireError> {
        queries::company::message_reactions(self.db()?, message_id).await
    }

    // --- Permissions ---

    async fn load_sector_default(&self, sector: &str) -> Result<Option<String>, DeskwireError> {
        queries::permissions::load_sector_default(self.db()?, sector).await
    }

    async fn save_sector_default(&self, sector: &str, raw: &str) -> Result<(), DeskwireError> {
        queries::permissions::save_sector_default(self.db()?, sector, raw).await
    }

    async fn load_user_override(&self, user_id: &str) -> Result<Option<String>, DeskwireError> {
        queries::permissions::load_user_override(self.db()?, user_id).await
    }

    async fn replace_user_override(
        &self,
        user_id: &str,
        raw: &str,
    ) -> Result<(), DeskwireError> {
        queries::permissions::replace_user_override(self.db()?, user_id, raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskwire_core::types::TicketStatus;
    use tempfile::tempdir;

    fn config_for(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir
                .path()
                .join("adapter.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn uninitialized_adapter_errors() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_for(&dir));
        let err = storage.get_user("u1").await.unwrap_err();
        assert!(matches!(err, DeskwireError::Storage { .. }));
    }

    #[tokio::test]
    async fn double_initialize_errors() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_for(&dir));
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn full_lifecycle_with_health_check() {
        let dir = tempdir().unwrap();
        let storage = SqliteStorage::new(config_for(&dir));
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);

        let ticket = Ticket::new("5511999990000".to_string());
        storage.create_or_get_ticket(&ticket).await.unwrap();
        storage
            .update_ticket_status("5511999990000", TicketStatus::Resolved)
            .await
            .unwrap();

        storage.close().await.unwrap();
        storage.shutdown().await.unwrap();
    }
}
