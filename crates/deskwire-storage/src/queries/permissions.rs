// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sector defaults and per-user permission overrides.
//!
//! Permission lists are stored as raw JSON text. Parsing and
//! fail-closed handling of malformed rows belong to the permission
//! directory, not this layer.

use deskwire_core::DeskwireError;
use rusqlite::params;

use crate::database::Database;

/// Raw JSON permission list for a sector, if one was ever saved.
pub async fn load_sector_default(
    db: &Database,
    sector: &str,
) -> Result<Option<String>, DeskwireError> {
    let sector = sector.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT permissions FROM sector_permissions WHERE sector = ?1",
                params![sector],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(json) => Ok(Some(json)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Save (or replace) the default permission list for a sector.
pub async fn save_sector_default(
    db: &Database,
    sector: &str,
    permissions_json: &str,
) -> Result<(), DeskwireError> {
    let sector = sector.to_string();
    let permissions_json = permissions_json.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sector_permissions (sector, permissions)
                 VALUES (?1, ?2)
                 ON CONFLICT(sector) DO UPDATE SET permissions = excluded.permissions",
                params![sector, permissions_json],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Raw JSON override for a user, if one exists.
pub async fn load_user_override(
    db: &Database,
    user_id: &str,
) -> Result<Option<String>, DeskwireError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT permissions FROM user_permissions WHERE user_id = ?1",
                params![user_id],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(json) => Ok(Some(json)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace a user's override atomically: the old row is gone and the
/// new one is in place, or neither change applied.
pub async fn replace_user_override(
    db: &Database,
    user_id: &str,
    permissions_json: &str,
) -> Result<(), DeskwireError> {
    let user_id = user_id.to_string();
    let permissions_json = permissions_json.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM user_permissions WHERE user_id = ?1",
                params![user_id],
            )?;
            tx.execute(
                "INSERT INTO user_permissions (user_id, permissions) VALUES (?1, ?2)",
                params![user_id, permissions_json],
            )?;
            tx.commit()?;
            Ok(())
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
        let db_path = dir.path().join("perms.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn sector_default_roundtrip() {
        let (db, _dir) = setup_db().await;
        assert!(load_sector_default(&db, "RH").await.unwrap().is_none());

        save_sector_default(&db, "RH", r#"["view_tickets","view_chat"]"#)
            .await
            .unwrap();
        let json = load_sector_default(&db, "RH").await.unwrap().unwrap();
        assert_eq!(json, r#"["view_tickets","view_chat"]"#);

        save_sector_default(&db, "RH", r#"["view_chat"]"#).await.unwrap();
        let json = load_sector_default(&db, "RH").await.unwrap().unwrap();
        assert_eq!(json, r#"["view_chat"]"#);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn user_override_is_full_replacement() {
        let (db, _dir) = setup_db().await;
        replace_user_override(&db, "u1", r#"["view_tickets","send_messages"]"#)
            .await
            .unwrap();
        replace_user_override(&db, "u1", r#"["view_chat"]"#).await.unwrap();

        let json = load_user_override(&db, "u1").await.unwrap().unwrap();
        assert_eq!(json, r#"["view_chat"]"#);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn malformed_json_is_stored_verbatim() {
        // This layer stores opaque text; the directory fails closed on parse.
        let (db, _dir) = setup_db().await;
        replace_user_override(&db, "u1", "not json").await.unwrap();
        let json = load_user_override(&db, "u1").await.unwrap().unwrap();
        assert_eq!(json, "not json");
        db.close().await.unwrap();
    }
}
