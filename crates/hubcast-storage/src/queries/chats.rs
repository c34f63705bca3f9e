// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat registry operations.

use std::str::FromStr;

use rusqlite::params;

use hubcast_core::{Chat, ChatId, ChatKind, HubcastError};

use crate::database::{map_tr_err, now_iso, Database};

fn chat_from_row(row: &rusqlite::Row<'_>) -> Result<Chat, rusqlite::Error> {
    let kind: String = row.get(1)?;
    Ok(Chat {
        id: ChatId(row.get(0)?),
        kind: ChatKind::from_str(&kind).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        title: row.get(2)?,
        username: row.get(3)?,
        active: row.get(4)?,
        is_source: row.get(5)?,
        is_destination: row.get(6)?,
        allow_self_send: row.get(7)?,
        in_paused: row.get(8)?,
        out_paused: row.get(9)?,
        registered_at: row.get(10)?,
    })
}

const CHAT_COLUMNS: &str = "chat_id, chat_kind, title, username, active, is_source, \
     is_destination, allow_self_send, in_paused, out_paused, registered_at";

/// Insert a chat on first sight, or refresh its metadata and reactivate it.
///
/// `registered_at` is preserved on conflict: the trial window is anchored
/// to the first registration.
pub async fn upsert(
    db: &Database,
    id: ChatId,
    kind: ChatKind,
    title: Option<String>,
    username: Option<String>,
) -> Result<Chat, HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chats (chat_id, chat_kind, title, username, registered_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT (chat_id) DO UPDATE SET
                     chat_kind = excluded.chat_kind,
                     title = excluded.title,
                     username = excluded.username,
                     active = 1,
                     updated_at = excluded.updated_at",
                params![id.0, kind.to_string(), title, username, now],
            )?;
            let chat = conn.query_row(
                &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE chat_id = ?1"),
                params![id.0],
                chat_from_row,
            )?;
            Ok(chat)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single chat by id.
pub async fn get(db: &Database, id: ChatId) -> Result<Option<Chat>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let chat = conn
                .query_row(
                    &format!("SELECT {CHAT_COLUMNS} FROM chats WHERE chat_id = ?1"),
                    params![id.0],
                    chat_from_row,
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(chat)
        })
        .await
        .map_err(map_tr_err)
}

/// All active chats flagged as destinations.
pub async fn active_destinations(db: &Database) -> Result<Vec<Chat>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHAT_COLUMNS} FROM chats
                 WHERE active = 1 AND is_destination = 1
                 ORDER BY chat_id"
            ))?;
            let rows = stmt.query_map([], chat_from_row)?;
            let mut chats = Vec::new();
            for row in rows {
                chats.push(row?);
            }
            Ok(chats)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a chat is registered, active, and flagged as a source.
pub async fn is_active_source(db: &Database, id: ChatId) -> Result<bool, HubcastError> {
    db.connection()
        .call(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT chat_id FROM chats
                     WHERE chat_id = ?1 AND active = 1 AND is_source = 1",
                    params![id.0],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(found.is_some())
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete: mark a chat inactive. Used after permanent send failures.
pub async fn deactivate(db: &Database, id: ChatId) -> Result<(), HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chats SET active = 0, updated_at = ?2 WHERE chat_id = ?1",
                params![id.0, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Handle group-to-supergroup migration: move the registry row to the new
/// id, or deactivate the old row if the new id is already registered.
pub async fn rename(db: &Database, old: ChatId, new: ChatId) -> Result<(), HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT chat_id FROM chats WHERE chat_id = ?1",
                    params![new.0],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            if exists.is_some() {
                conn.execute(
                    "UPDATE chats SET active = 0, updated_at = ?2 WHERE chat_id = ?1",
                    params![old.0, now],
                )?;
            } else {
                conn.execute(
                    "UPDATE chats
                     SET chat_id = ?2, chat_kind = 'supergroup', updated_at = ?3
                     WHERE chat_id = ?1",
                    params![old.0, new.0, now],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle whether a chat receives copies of its own messages.
pub async fn set_allow_self_send(
    db: &Database,
    id: ChatId,
    enabled: bool,
) -> Result<(), HubcastError> {
    set_flag(db, id, "allow_self_send", enabled).await
}

/// Pause or resume deliveries INTO a chat.
pub async fn set_in_paused(db: &Database, id: ChatId, paused: bool) -> Result<(), HubcastError> {
    set_flag(db, id, "in_paused", paused).await
}

/// Pause or resume fan-out FROM a chat.
pub async fn set_out_paused(db: &Database, id: ChatId, paused: bool) -> Result<(), HubcastError> {
    set_flag(db, id, "out_paused", paused).await
}

async fn set_flag(
    db: &Database,
    id: ChatId,
    column: &'static str,
    value: bool,
) -> Result<(), HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                &format!("UPDATE chats SET {column} = ?2, updated_at = ?3 WHERE chat_id = ?1"),
                params![id.0, value, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Active chats whose registration falls in `[start, end)`.
///
/// Used by the trial reminder job to find trials expiring in N days.
pub async fn registered_between(
    db: &Database,
    start: String,
    end: String,
) -> Result<Vec<Chat>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CHAT_COLUMNS} FROM chats
                 WHERE active = 1 AND registered_at >= ?1 AND registered_at < ?2"
            ))?;
            let rows = stmt.query_map(params![start, end], chat_from_row)?;
            let mut chats = Vec::new();
            for row in rows {
                chats.push(row?);
            }
            Ok(chats)
        })
        .await
        .map_err(map_tr_err)
}
