// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value cells in `bot_config`: edit mode, signature, alias salt,
//! global pause. Read per task, never cached in a singleton.

use rusqlite::params;

use hubcast_core::HubcastError;

use crate::database::{map_tr_err, Database};

/// Read a configuration cell.
pub async fn get_value(db: &Database, key: &str) -> Result<Option<String>, HubcastError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM bot_config WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(other),
                })?;
            Ok(value)
        })
        .await
        .map_err(map_tr_err)
}

/// Write a configuration cell, overwriting any previous value.
pub async fn set_value(db: &Database, key: &str, value: &str) -> Result<(), HubcastError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO bot_config (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Read a boolean cell. Accepts `1`/`true` as true; absent reads as `default`.
pub async fn get_bool(db: &Database, key: &str, default: bool) -> Result<bool, HubcastError> {
    let value = get_value(db, key).await?;
    Ok(match value.as_deref() {
        Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        None => default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("config.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn set_get_overwrite() {
        let (db, _dir) = setup_db().await;
        assert!(get_value(&db, "edit_mode").await.unwrap().is_none());

        set_value(&db, "edit_mode", "resend").await.unwrap();
        assert_eq!(
            get_value(&db, "edit_mode").await.unwrap().as_deref(),
            Some("resend")
        );

        set_value(&db, "edit_mode", "off").await.unwrap();
        assert_eq!(
            get_value(&db, "edit_mode").await.unwrap().as_deref(),
            Some("off")
        );
    }

    #[tokio::test]
    async fn bool_cells_with_defaults() {
        let (db, _dir) = setup_db().await;
        assert!(get_bool(&db, "signature_enabled", true).await.unwrap());
        assert!(!get_bool(&db, "signature_enabled", false).await.unwrap());

        set_value(&db, "signature_enabled", "1").await.unwrap();
        assert!(get_bool(&db, "signature_enabled", false).await.unwrap());

        set_value(&db, "signature_enabled", "0").await.unwrap();
        assert!(!get_bool(&db, "signature_enabled", true).await.unwrap());
    }
}
