// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket mirror operations.
//!
//! The in-memory ticket store is authoritative; these rows are a
//! best-effort mirror. A reopened conversation resets its ticket row while
//! message rows accumulate across instances.

use deskwire_core::DeskwireError;
use deskwire_core::types::{Ticket, TicketMessage, TicketStatus};
use rusqlite::params;

use crate::database::Database;

/// Insert the ticket row, or reset it when the store started a fresh
/// instance under the same conversation key.
pub async fn upsert_ticket(db: &Database, ticket: &Ticket) -> Result<(), DeskwireError> {
    let ticket = ticket.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tickets (conversation_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(conversation_id) DO UPDATE SET
                    status = excluded.status,
                    created_at = excluded.created_at,
                    updated_at = excluded.updated_at",
                params![
                    ticket.id,
                    ticket.status.to_string(),
                    ticket.created_at,
                    ticket.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append a message row and touch the ticket's updated_at in one batch.
pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    message: &TicketMessage,
) -> Result<(), DeskwireError> {
    let conversation_id = conversation_id.to_string();
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR REPLACE INTO ticket_messages
                    (id, conversation_id, content, sender_name, sender_username,
                     is_operator, platform, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    message.id,
                    conversation_id,
                    message.content,
                    message.sender.name,
                    message.sender.username,
                    message.sender.is_operator,
                    message.platform,
                    message.timestamp,
                ],
            )?;
            tx.execute(
                "UPDATE tickets SET updated_at = ?1 WHERE conversation_id = ?2",
                params![message.timestamp, conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update a ticket's status and updated_at timestamp.
pub async fn update_status(
    db: &Database,
    conversation_id: &str,
    status: TicketStatus,
) -> Result<(), DeskwireError> {
    let conversation_id = conversation_id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tickets
                 SET status = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE conversation_id = ?2",
                params![status, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load the mirrored ticket row (without messages), if present.
pub async fn get_ticket_row(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<(TicketStatus, String, String)>, DeskwireError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status, created_at, updated_at FROM tickets WHERE conversation_id = ?1",
            )?;
            let result = stmt.query_row(params![conversation_id], |row| {
                let status: String = row.get(0)?;
                Ok((status, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            });
            match result {
                Ok((status, created, updated)) => {
                    let status = status
                        .parse::<TicketStatus>()
                        .unwrap_or(TicketStatus::Open);
                    Ok(Some((status, created, updated)))
                }
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
    use deskwire_core::types::Sender;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tickets.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn make_ticket(id: &str) -> Ticket {
        Ticket {
            id: id.to_string(),
            status: TicketStatus::Open,
            messages: vec![],
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    fn make_message(id: &str, content: &str) -> TicketMessage {
        TicketMessage {
            id: id.to_string(),
            content: content.to_string(),
            sender: Sender {
                name: "Maria".to_string(),
                username: "5511999990000".to_string(),
                is_operator: false,
            },
            platform: "whatsapp".to_string(),
            timestamp: "2026-01-01T00:00:01Z".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        upsert_ticket(&db, &make_ticket("5511999990000")).await.unwrap();

        let row = get_ticket_row(&db, "5511999990000").await.unwrap().unwrap();
        assert_eq!(row.0, TicketStatus::Open);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_resets_row_on_reopen() {
        let (db, _dir) = setup_db().await;
        upsert_ticket(&db, &make_ticket("c1")).await.unwrap();
        update_status(&db, "c1", TicketStatus::Resolved).await.unwrap();

        // Fresh instance under the same key.
        let mut reopened = make_ticket("c1");
        reopened.created_at = "2026-02-01T00:00:00Z".to_string();
        upsert_ticket(&db, &reopened).await.unwrap();

        let row = get_ticket_row(&db, "c1").await.unwrap().unwrap();
        assert_eq!(row.0, TicketStatus::Open);
        assert_eq!(row.1, "2026-02-01T00:00:00Z");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn append_message_touches_updated_at() {
        let (db, _dir) = setup_db().await;
        upsert_ticket(&db, &make_ticket("c2")).await.unwrap();
        append_message(&db, "c2", &make_message("m1", "Hello")).await.unwrap();

        let row = get_ticket_row(&db, "c2").await.unwrap().unwrap();
        assert_eq!(row.2, "2026-01-01T00:00:01Z");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_missing_ticket_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_ticket_row(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
