// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted user aliases. Aliases never change once written.

use rusqlite::params;

use hubcast_core::{HubcastError, UserId};

use crate::database::{map_tr_err, now_iso, Database};

/// The stored alias for a user, if one was ever issued.
pub async fn get(db: &Database, user: UserId) -> Result<Option<String>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let alias: Option<String> = conn
                .query_row(
                    "SELECT alias FROM user_aliases WHERE user_id = ?1",
                    params![user.0],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(alias)
        })
        .await
        .map_err(map_tr_err)
}

/// Persist an alias on first use. If a concurrent writer got there first
/// the stored alias wins; the stored value is returned either way.
pub async fn insert(
    db: &Database,
    user: UserId,
    alias: String,
) -> Result<String, HubcastError> {
    let now = now_iso();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO user_aliases (user_id, alias, created_at)
                 VALUES (?1, ?2, ?3)",
                params![user.0, alias, now],
            )?;
            let stored: String = conn.query_row(
                "SELECT alias FROM user_aliases WHERE user_id = ?1",
                params![user.0],
                |row| row.get(0),
            )?;
            Ok(stored)
        })
        .await
        .map_err(map_tr_err)
}

/// Reverse lookup for moderation commands addressing users by alias.
pub async fn lookup_by_alias(
    db: &Database,
    alias: String,
) -> Result<Option<UserId>, HubcastError> {
    db.connection()
        .call(move |conn| {
            let user: Option<i64> = conn
                .query_row(
                    "SELECT user_id FROM user_aliases WHERE alias = ?1",
                    params![alias],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(user.map(UserId))
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("aliases.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn insert_is_first_writer_wins() {
        let (db, _dir) = setup_db().await;
        assert!(get(&db, UserId(7)).await.unwrap().is_none());

        let stored = insert(&db, UserId(7), "u-a3x7k2".into()).await.unwrap();
        assert_eq!(stored, "u-a3x7k2");

        // A second insert for the same user keeps the original alias.
        let stored = insert(&db, UserId(7), "u-zzzzzz".into()).await.unwrap();
        assert_eq!(stored, "u-a3x7k2");
        assert_eq!(get(&db, UserId(7)).await.unwrap().as_deref(), Some("u-a3x7k2"));
    }

    #[tokio::test]
    async fn alias_reverse_lookup() {
        let (db, _dir) = setup_db().await;
        insert(&db, UserId(7), "u-a3x7k2".into()).await.unwrap();

        assert_eq!(
            lookup_by_alias(&db, "u-a3x7k2".into()).await.unwrap(),
            Some(UserId(7))
        );
        assert!(lookup_by_alias(&db, "u-nosuch".into())
            .await
            .unwrap()
            .is_none());
    }
}
