// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send log operations: the forward/reverse index behind reply threading
//! and edit propagation.

use rusqlite::params;

use hubcast_core::{ChatId, HubcastError, MessageId, UserId};

use crate::database::{map_tr_err, now_iso, Database};

/// Record one delivered copy after a successful send.
///
/// `INSERT OR IGNORE` keeps the (dest chat, dest message) uniqueness
/// invariant when an at-least-once retry re-records an outcome.
pub async fn record(
    db: &Database,
    source_chat: ChatId,
    source_message: MessageId,
    source_user: Option<UserId>,
    dest_chat: ChatId,
    dest_message: MessageId,
) -> Result<(), HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO send_log
                 (source_chat_id, source_message_id, source_user_id,
                  dest_chat_id, dest_message_id, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    source_chat.0,
                    source_message.0,
                    source_user.map(|u| u.0),
                    dest_chat.0,
                    dest_message.0,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All delivered copies of a source message, one per destination.
pub async fn forward_lookup(
    db: &Database,
    source_chat: ChatId,
    source_message: MessageId,
) -> Result<Vec<(ChatId, MessageId)>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT dest_chat_id, dest_message_id FROM send_log
                 WHERE source_chat_id = ?1 AND source_message_id = ?2",
            )?;
            let rows = stmt.query_map(params![source_chat.0, source_message.0], |row| {
                Ok((ChatId(row.get(0)?), MessageId(row.get(1)?)))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

/// The delivered copy of a source message in one specific destination.
pub async fn dest_message_id(
    db: &Database,
    source_chat: ChatId,
    source_message: MessageId,
    dest_chat: ChatId,
) -> Result<Option<MessageId>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let id: Option<i64> = conn
                .query_row(
                    "SELECT dest_message_id FROM send_log
                     WHERE source_chat_id = ?1 AND source_message_id = ?2
                       AND dest_chat_id = ?3
                     LIMIT 1",
                    params![source_chat.0, source_message.0, dest_chat.0],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(id.map(MessageId))
        })
        .await
        .map_err(map_tr_err)
}

/// Given a bot-sent message, find the source coordinates it was copied
/// from. Returns `None` when the row was pruned (older than retention).
pub async fn reverse_lookup(
    db: &Database,
    dest_chat: ChatId,
    dest_message: MessageId,
) -> Result<Option<(ChatId, MessageId, Option<UserId>)>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let row: Option<(i64, i64, Option<i64>)> = conn
                .query_row(
                    "SELECT source_chat_id, source_message_id, source_user_id
                     FROM send_log
                     WHERE dest_chat_id = ?1 AND dest_message_id = ?2
                     LIMIT 1",
                    params![dest_chat.0, dest_message.0],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(row.map(|(chat, message, user)| {
                (ChatId(chat), MessageId(message), user.map(UserId))
            }))
        })
        .await
        .map_err(map_tr_err)
}

/// All delivered copies originating from one user, for moderation cleanup.
pub async fn dest_messages_by_user(
    db: &Database,
    user: UserId,
) -> Result<Vec<(ChatId, MessageId)>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT dest_chat_id, dest_message_id FROM send_log
                 WHERE source_user_id = ?1",
            )?;
            let rows = stmt.query_map(params![user.0], |row| {
                Ok((ChatId(row.get(0)?), MessageId(row.get(1)?)))
            })?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            Ok(out)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete up to `batch` rows older than `cutoff`. Returns the number of
/// rows deleted; the sweeper loops until this reaches zero so a large
/// backlog never blocks the connection for long.
pub async fn prune_before(
    db: &Database,
    cutoff: String,
    batch: usize,
) -> Result<usize, HubcastError> {
    db.connection()
        .call(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM send_log WHERE id IN
                 (SELECT id FROM send_log WHERE sent_at < ?1 LIMIT ?2)",
                params![cutoff, batch as i64],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}
