// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Staff user directory operations.

use deskwire_core::DeskwireError;
use deskwire_core::types::{Role, UserRecord};
use rusqlite::params;

use crate::database::Database;

/// Insert or replace a user row.
pub async fn upsert_user(db: &Database, user: &UserRecord) -> Result<(), DeskwireError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO users (id, name, username, role, sector)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    username = excluded.username,
                    role = excluded.role,
                    sector = excluded.sector",
                params![
                    user.id,
                    user.name,
                    user.username,
                    user.role.to_string(),
                    user.sector,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a user by id.
pub async fn get_user(db: &Database, user_id: &str) -> Result<Option<UserRecord>, DeskwireError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, username, role, sector FROM users WHERE id = ?1")?;
            let result = stmt.query_row(params![user_id], |row| {
                let role: String = row.get(3)?;
                Ok(UserRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    username: row.get(2)?,
                    role: role.parse::<Role>().unwrap_or(Role::Agent),
                    sector: row.get(4)?,
                })
            });
            match result {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("users.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_and_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        let user = UserRecord {
            id: "u1".into(),
            name: "Ana Souza".into(),
            username: "ana".into(),
            role: Role::Agent,
            sector: "RH".into(),
        };
        upsert_user(&db, &user).await.unwrap();

        let loaded = get_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(loaded, user);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_replaces_existing_fields() {
        let (db, _dir) = setup_db().await;
        let mut user = UserRecord {
            id: "u1".into(),
            name: "Ana".into(),
            username: "ana".into(),
            role: Role::Agent,
            sector: "RH".into(),
        };
        upsert_user(&db, &user).await.unwrap();

        user.name = "Ana Lima".into();
        user.role = Role::Admin;
        upsert_user(&db, &user).await.unwrap();

        let loaded = get_user(&db, "u1").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Ana Lima");
        assert_eq!(loaded.role, Role::Admin);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_user_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_user(&db, "ghost").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
