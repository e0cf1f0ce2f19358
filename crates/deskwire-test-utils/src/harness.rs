// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared storage fixtures for integration tests.

use std::sync::Arc;

use tempfile::TempDir;

use deskwire_config::model::StorageConfig;
use deskwire_core::types::{Role, UserRecord};
use deskwire_core::StorageAdapter;
use deskwire_storage::SqliteStorage;

/// In-memory SQLite storage, initialized and ready for use.
///
/// Backed by tokio-rusqlite's single connection, so the database lives
/// exactly as long as the returned adapter.
pub async fn memory_storage() -> Arc<dyn StorageAdapter> {
    let storage = SqliteStorage::new(StorageConfig {
        database_path: ":memory:".into(),
        wal_mode: false,
    });
    storage
        .initialize()
        .await
        .expect("in-memory storage should initialize");
    Arc::new(storage)
}

/// A file-backed storage fixture whose database directory is cleaned up
/// on drop. Use when a test exercises reopen or WAL behavior.
pub struct TestHarness {
    pub storage: Arc<dyn StorageAdapter>,
    _dir: TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = SqliteStorage::new(StorageConfig {
            database_path: dir
                .path()
                .join("deskwire-test.db")
                .to_string_lossy()
                .into_owned(),
            wal_mode: true,
        });
        storage
            .initialize()
            .await
            .expect("test storage should initialize");
        Self {
            storage: Arc::new(storage),
            _dir: dir,
        }
    }

    /// Seed a staff user, returning its id for convenience.
    pub async fn seed_user(&self, id: &str, name: &str, role: Role, sector: &str) -> String {
        self.storage
            .upsert_user(&UserRecord {
                id: id.into(),
                name: name.into(),
                username: id.into(),
                role,
                sector: sector.into(),
            })
            .await
            .expect("seed user");
        id.to_string()
    }
}
