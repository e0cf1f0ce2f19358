// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use deskwire_core::DeskwireError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

/// Handle to the SQLite database, wrapping a tokio-rusqlite connection.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply pragmas, and run
    /// embedded migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, DeskwireError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| DeskwireError::Storage {
                    source: Box::new(e),
                })?;
            }
        }

        let conn = Connection::open(path).await.map_err(|e| DeskwireError::Storage {
            source: Box::new(e),
        })?;

        let migration_result = conn
            .call(move |c| {
                if wal_mode {
                    c.pragma_update(None, "journal_mode", "WAL")?;
                }
                c.pragma_update(None, "synchronous", "NORMAL")?;
                c.pragma_update(None, "foreign_keys", "ON")?;
                c.pragma_update(None, "busy_timeout", 5000)?;
                Ok(migrations::run_migrations(c))
            })
            .await
            .map_err(map_tr_err)?;
        migration_result?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// Access the underlying connection for query modules.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so readers of the raw file see a consistent state.
    pub async fn close(&self) -> Result<(), DeskwireError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Convert a tokio-rusqlite error into the workspace storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> DeskwireError {
    DeskwireError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_database_file() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("open.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        assert!(db_path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/dirs/desk.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        assert!(db_path.exists());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_on_a_directory_is_a_storage_error() {
        let dir = tempdir().unwrap();
        // A directory is not a valid database file; the driver's open
        // error must surface as DeskwireError::Storage.
        let err = Database::open(dir.path().to_str().unwrap(), false)
            .await
            .unwrap_err();
        assert!(matches!(err, DeskwireError::Storage { .. }));
    }

    #[tokio::test]
    async fn migrations_are_idempotent_across_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap().to_string();

        let db = Database::open(&path, true).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Second open must not re-apply V1.
        let db = Database::open(&path, true).await.unwrap();
        db.close().await.unwrap();
    }
}
