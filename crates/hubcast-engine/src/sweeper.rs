// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hourly pruning of the send log.
//!
//! Rows older than the 48 h retention window are unreliable anyway
//! (callers tolerate misses), so they are deleted in bounded batches to
//! keep the connection responsive.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use hubcast_core::HubcastError;
use hubcast_storage::{iso, queries, Database};

/// Send log retention window.
pub const RETENTION: chrono::Duration = chrono::Duration::hours(48);
/// Interval between sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);
/// Rows deleted per batch.
const BATCH: usize = 1000;

/// Start the hourly retention sweeper. The first sweep runs immediately;
/// the task exits when the token is cancelled.
pub fn spawn(db: Database, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("retention sweeper started");
        loop {
            match sweep(&db).await {
                Ok(0) => {}
                Ok(deleted) => info!(deleted, "pruned send log rows past retention"),
                Err(e) => error!(error = %e, "send log sweep failed"),
            }
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(SWEEP_INTERVAL) => {}
            }
        }
        info!("retention sweeper stopped");
    })
}

/// Delete everything past retention, in batches. Returns rows deleted.
pub async fn sweep(db: &Database) -> Result<usize, HubcastError> {
    let cutoff = iso(Utc::now() - RETENTION);
    let mut total = 0;
    loop {
        let deleted = queries::send_log::prune_before(db, cutoff.clone(), BATCH).await?;
        total += deleted;
        if deleted < BATCH {
            return Ok(total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcast_core::{ChatId, MessageId};
    use rusqlite::params;
    use tempfile::tempdir;

    #[tokio::test]
    async fn sweep_deletes_everything_past_retention() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("sweeper.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let stale = iso(Utc::now() - chrono::Duration::hours(50));
        for i in 0..7 {
            let stale = stale.clone();
            db.connection()
                .call(move |conn| {
                    conn.execute(
                        "INSERT INTO send_log
                         (source_chat_id, source_message_id, dest_chat_id,
                          dest_message_id, sent_at)
                         VALUES (100, ?1, 200, ?2, ?3)",
                        params![i, 100 + i, stale],
                    )?;
                    Ok(())
                })
                .await
                .unwrap();
        }
        queries::send_log::record(
            &db,
            ChatId(100),
            MessageId(50),
            None,
            ChatId(200),
            MessageId(999),
        )
        .await
        .unwrap();

        assert_eq!(sweep(&db).await.unwrap(), 7);
        assert_eq!(sweep(&db).await.unwrap(), 0);

        // Fresh rows survive.
        let rows = queries::send_log::forward_lookup(&db, ChatId(100), MessageId(50))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
