// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Company chat messages and per-message reactions.

use deskwire_core::DeskwireError;
use deskwire_core::types::{CompanyMessage, ReactionSet};
use rusqlite::params;

use crate::database::Database;

/// Persist a company chat message. Mentions are stored as a JSON array.
pub async fn save_company_message(
    db: &Database,
    message: &CompanyMessage,
) -> Result<(), DeskwireError> {
    let message = message.clone();
    let mentions = serde_json::to_string(&message.mentions)
        .map_err(|e| DeskwireError::Internal(format!("serialize mentions: {e}")))?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO company_messages (id, user_id, content, created_at, reply_to, mentions)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id,
                    message.user_id,
                    message.content,
                    message.created_at,
                    message.reply_to,
                    mentions,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Toggle a reaction: removes the (user, emoji) pair when present,
/// inserts it when absent. Returns the full reaction set afterwards.
pub async fn toggle_reaction(
    db: &Database,
    message_id: &str,
    user_id: &str,
    emoji: &str,
) -> Result<ReactionSet, DeskwireError> {
    let message_id = message_id.to_string();
    let user_id = user_id.to_string();
    let emoji = emoji.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM message_reactions
                 WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
                params![message_id, user_id, emoji],
            )?;
            if removed == 0 {
                tx.execute(
                    "INSERT INTO message_reactions (message_id, user_id, emoji, created_at)
                     VALUES (?1, ?2, ?3, strftime('%Y-%m-%d %H:%M:%f', 'now'))",
                    params![message_id, user_id, emoji],
                )?;
            }
            let reactions = collect_reactions(&tx, &message_id)?;
            tx.commit()?;
            Ok(reactions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Current reaction set for a message. Empty map when no reactions exist.
pub async fn message_reactions(
    db: &Database,
    message_id: &str,
) -> Result<ReactionSet, DeskwireError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| Ok(collect_reactions(conn, &message_id)?))
        .await
        .map_err(crate::database::map_tr_err)
}

fn collect_reactions(
    conn: &rusqlite::Connection,
    message_id: &str,
) -> Result<ReactionSet, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT emoji, user_id FROM message_reactions WHERE message_id = ?1",
    )?;
    let rows = stmt.query_map(params![message_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut set = ReactionSet::new();
    for row in rows {
        let (emoji, user_id) = row?;
        set.entry(emoji).or_default().insert(user_id);
    }
    Ok(set)
}
