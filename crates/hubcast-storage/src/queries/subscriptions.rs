// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription rows backing the paywall gate.

use rusqlite::params;

use hubcast_core::{ChatId, HubcastError, Subscription, UserId};

use crate::database::{map_tr_err, now_iso, Database};

/// Record a paid subscription.
///
/// `starts_at` lets purchases stack: the handler layer passes the current
/// expiry of an existing subscription so the new period begins after it.
pub async fn add(
    db: &Database,
    chat: ChatId,
    user: UserId,
    plan: String,
    stars_amount: i64,
    starts_at: String,
    expires_at: String,
    payment_ref: String,
) -> Result<(), HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO subscriptions
                 (chat_id, user_id, plan, stars_amount, starts_at, expires_at,
                  payment_ref, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    chat.0,
                    user.0,
                    plan,
                    stars_amount,
                    starts_at,
                    expires_at,
                    payment_ref,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The unexpired subscription with the latest expiry, if any.
pub async fn active_subscription(
    db: &Database,
    chat: ChatId,
) -> Result<Option<Subscription>, HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let sub = conn
                .query_row(
                    "SELECT chat_id, user_id, plan, stars_amount, expires_at
                     FROM subscriptions
                     WHERE chat_id = ?1 AND expires_at > ?2
                     ORDER BY expires_at DESC
                     LIMIT 1",
                    params![chat.0, now],
                    |row| {
                        Ok(Subscription {
                            chat: ChatId(row.get(0)?),
                            user: UserId(row.get(1)?),
                            plan: row.get(2)?,
                            stars_amount: row.get(3)?,
                            expires_at: row.get(4)?,
                        })
                    },
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(sub)
        })
        .await
        .map_err(map_tr_err)
}

/// The latest expiry across all of a chat's subscriptions, expired or not.
///
/// Purchases stack on top of this instant.
pub async fn latest_expiry(db: &Database, chat: ChatId) -> Result<Option<String>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let expiry: Option<String> = conn
                .query_row(
                    "SELECT MAX(expires_at) FROM subscriptions WHERE chat_id = ?1",
                    params![chat.0],
                    |row| row.get(0),
                )
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(expiry)
        })
        .await
        .map_err(map_tr_err)
}
