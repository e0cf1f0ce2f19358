// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Private staff-to-staff message persistence.

use deskwire_core::DeskwireError;
use deskwire_core::types::PrivateMessage;
use rusqlite::params;

use crate::database::Database;

/// Persist a private message. `sender_name` is not stored; it is
/// resolved against the user directory at read time.
pub async fn save_private_message(
    db: &Database,
    message: &PrivateMessage,
) -> Result<(), DeskwireError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO private_messages (id, from_user_id, to_user_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id,
                    message.from_user_id,
                    message.to_user_id,
                    message.content,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Full conversation between two users, both directions, oldest first.
/// Each message carries the sender's current display name when the
/// sender still exists in the user directory.
pub async fn private_history(
    db: &Database,
    user_a: &str,
    user_b: &str,
) -> Result<Vec<PrivateMessage>, DeskwireError> {
    let user_a = user_a.to_string();
    let user_b = user_b.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.from_user_id, m.to_user_id, m.content, m.created_at, u.name
                 FROM private_messages m
                 LEFT JOIN users u ON u.id = m.from_user_id
                 WHERE (m.from_user_id = ?1 AND m.to_user_id = ?2)
                    OR (m.from_user_id = ?2 AND m.to_user_id = ?1)
                 ORDER BY m.created_at ASC, m.rowid ASC",
            )?;
            let rows = stmt.query_map(params![user_a, user_b], |row| {
                Ok(PrivateMessage {
                    id: row.get(0)?,
                    from_user_id: row.get(1)?,
                    to_user_id: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                    sender_name: row.get(5)?,
                })
            })?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a single private message by id.
pub async fn get_private_message(
    db: &Database,
    message_id: &str,
) -> Result<Option<PrivateMessage>, DeskwireError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.from_user_id, m.to_user_id, m.content, m.created_at, u.name
                 FROM private_messages m
                 LEFT JOIN users u ON u.id = m.from_user_id
                 WHERE m.id = ?1",
            )?;
            let result = stmt.query_row(params![message_id], |row| {
                Ok(PrivateMessage {
                    id: row.get(0)?,
                    from_user_id: row.get(1)?,
                    to_user_id: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                    sender_name: row.get(5)?,
                })
            });
            match result {
                Ok(message) => Ok(Some(message)),
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
    use deskwire_core::types::{Role, UserRecord};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("pm.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn pm(id: &str, from: &str, to: &str, content: &str, at: &str) -> PrivateMessage {
        PrivateMessage {
            id: id.into(),
            from_user_id: from.into(),
            to_user_id: to.into(),
            content: content.into(),
            created_at: at.into(),
            sender_name: None,
        }
    }

    #[tokio::test]
    async fn history_is_symmetric_and_ordered() {
        let (db, _dir) = setup_db().await;
        save_private_message(&db, &pm("m1", "u1", "u2", "hey", "2026-08-30 10:00:00"))
            .await
            .unwrap();
        save_private_message(&db, &pm("m2", "u2", "u1", "hi back", "2026-08-30 10:00:05"))
            .await
            .unwrap();
        save_private_message(&db, &pm("m3", "u1", "u3", "other thread", "2026-08-30 10:00:10"))
            .await
            .unwrap();

        let forward = private_history(&db, "u1", "u2").await.unwrap();
        let backward = private_history(&db, "u2", "u1").await.unwrap();
        assert_eq!(forward, backward);
        assert_eq!(
            forward.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2"]
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sender_name_resolved_at_read_time() {
        let (db, _dir) = setup_db().await;
        save_private_message(&db, &pm("m1", "u1", "u2", "hello", "2026-08-30 10:00:00"))
            .await
            .unwrap();

        // Unknown sender: no name attached.
        let history = private_history(&db, "u1", "u2").await.unwrap();
        assert_eq!(history[0].sender_name, None);

        crate::queries::users::upsert_user(
            &db,
            &UserRecord {
                id: "u1".into(),
                name: "Ana".into(),
                username: "ana".into(),
                role: Role::Agent,
                sector: "RH".into(),
            },
        )
        .await
        .unwrap();

        let history = private_history(&db, "u1", "u2").await.unwrap();
        assert_eq!(history[0].sender_name.as_deref(), Some("Ana"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_by_id_handles_missing() {
        let (db, _dir) = setup_db().await;
        save_private_message(&db, &pm("m1", "u1", "u2", "hello", "2026-08-30 10:00:00"))
            .await
            .unwrap();
        assert!(get_private_message(&db, "m1").await.unwrap().is_some());
        assert!(get_private_message(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
