// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moderation restriction rows (mutes and bans).

use std::str::FromStr;

use rusqlite::params;

use hubcast_core::{HubcastError, Restriction, RestrictionKind, UserId};

use crate::database::{map_tr_err, now_iso, Database};

/// Record a restriction against a user. `expires_at = None` is permanent.
pub async fn add(
    db: &Database,
    user: UserId,
    kind: RestrictionKind,
    issued_by: UserId,
    expires_at: Option<String>,
) -> Result<(), HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO user_restrictions
                 (user_id, kind, issued_by, issued_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user.0, kind.to_string(), issued_by.0, now, expires_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Deactivate every restriction against a user.
pub async fn lift(db: &Database, user: UserId) -> Result<(), HubcastError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE user_restrictions SET active = 0 WHERE user_id = ?1",
                params![user.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The currently-effective restriction against a user, if any.
///
/// A ban outranks a mute when both are active.
pub async fn active_restriction(
    db: &Database,
    user: UserId,
) -> Result<Option<Restriction>, HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            let row: Option<(String, i64, Option<String>)> = conn
                .query_row(
                    "SELECT kind, issued_by, expires_at FROM user_restrictions
                     WHERE user_id = ?1 AND active = 1
                       AND (expires_at IS NULL OR expires_at > ?2)
                     ORDER BY CASE kind WHEN 'ban' THEN 0 ELSE 1 END
                     LIMIT 1",
                    params![user.0, now],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            let restriction = row
                .map(|(kind, issued_by, expires_at)| {
                    let kind = RestrictionKind::from_str(&kind).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?;
                    Ok::<_, rusqlite::Error>(Restriction {
                        user,
                        kind,
                        issued_by: UserId(issued_by),
                        expires_at,
                    })
                })
                .transpose()?;
            Ok(restriction)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    use crate::database::iso;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("restrictions.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn expired_mute_is_not_active() {
        let (db, _dir) = setup_db().await;
        let expired = iso(Utc::now() - Duration::minutes(1));
        add(&db, UserId(7), RestrictionKind::Mute, UserId(1), Some(expired))
            .await
            .unwrap();
        assert!(active_restriction(&db, UserId(7)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn permanent_ban_stays_active_until_lifted() {
        let (db, _dir) = setup_db().await;
        add(&db, UserId(7), RestrictionKind::Ban, UserId(1), None)
            .await
            .unwrap();

        let active = active_restriction(&db, UserId(7)).await.unwrap().unwrap();
        assert_eq!(active.kind, RestrictionKind::Ban);
        assert_eq!(active.issued_by, UserId(1));

        lift(&db, UserId(7)).await.unwrap();
        assert!(active_restriction(&db, UserId(7)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ban_outranks_mute() {
        let (db, _dir) = setup_db().await;
        let later = iso(Utc::now() + Duration::hours(1));
        add(&db, UserId(7), RestrictionKind::Mute, UserId(1), Some(later))
            .await
            .unwrap();
        add(&db, UserId(7), RestrictionKind::Ban, UserId(1), None)
            .await
            .unwrap();

        let active = active_restriction(&db, UserId(7)).await.unwrap().unwrap();
        assert_eq!(active.kind, RestrictionKind::Ban);
    }
}
