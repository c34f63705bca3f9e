// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trial-expiry reminders.
//!
//! Once a day, chats whose free trial ends in 7, 3, or 1 days get a
//! heads-up. A fast-store marker keeps each (chat, days-left) reminder
//! from repeating, and chats that already paid are skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use hubcast_core::{ChatId, FastStore, HubcastError, PlatformClient, SendOptions};
use hubcast_storage::{iso, queries, Database};

/// Days before trial expiry at which a reminder goes out.
const REMINDER_DAYS: [i64; 3] = [7, 3, 1];
/// Interval between reminder passes.
const RUN_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Delay before the first pass, so startup traffic settles.
const INITIAL_DELAY: Duration = Duration::from_secs(60);
const SENT_MARKER_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Dependencies for the reminder job.
pub struct TrialReminder {
    pub db: Database,
    pub store: Arc<dyn FastStore>,
    pub platform: Arc<dyn PlatformClient>,
    pub trial_days: i64,
    pub admin_chat_ids: Vec<i64>,
}

impl TrialReminder {
    /// Start the daily reminder pass. Exits when the token is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("trial reminder task started");
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(INITIAL_DELAY) => {}
            }
            loop {
                if let Err(e) = self.run_once().await {
                    error!(error = %e, "trial reminder pass failed");
                }
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(RUN_INTERVAL) => {}
                }
            }
            info!("trial reminder task stopped");
        })
    }

    /// One reminder pass over all expiry buckets.
    pub async fn run_once(&self) -> Result<(), HubcastError> {
        for days_left in REMINDER_DAYS {
            // Trial ends `days_left` days from now for chats registered in
            // [now - trial + days_left, now - trial + days_left + 1).
            let window_start = Utc::now() - chrono::Duration::days(self.trial_days - days_left);
            let window_end = window_start + chrono::Duration::days(1);
            let chats = queries::chats::registered_between(
                &self.db,
                iso(window_start),
                iso(window_end),
            )
            .await?;

            for chat in chats {
                if self.admin_chat_ids.contains(&chat.id.0) {
                    continue;
                }
                if queries::subscriptions::active_subscription(&self.db, chat.id)
                    .await?
                    .is_some()
                {
                    continue;
                }
                let marker = format!("trial_remind:{}:{days_left}", chat.id.0);
                match self.store.set_if_absent(&marker, "1", SENT_MARKER_TTL).await {
                    Ok(true) => self.send_reminder(chat.id, days_left).await,
                    Ok(false) => {}
                    Err(e) => debug!(chat_id = chat.id.0, error = %e, "reminder marker failed"),
                }
            }
        }
        Ok(())
    }

    async fn send_reminder(&self, chat: ChatId, days_left: i64) {
        let text = match days_left {
            1 => "Last day of free access. After today, messages from other \
                  chats will pause; your own messages keep flowing. Subscribe \
                  to keep your whole network connected."
                .to_string(),
            _ => format!(
                "Your free access ends in {days_left} days. To keep getting \
                 messages from your full network after that, subscribe any \
                 time before then."
            ),
        };
        if let Err(e) = self
            .platform
            .send_text(chat, &text, &SendOptions::default())
            .await
        {
            debug!(chat_id = chat.0, error = %e, "trial reminder send failed");
        } else {
            info!(chat_id = chat.0, days_left, "sent trial reminder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcast_core::{ChatKind, MemoryStore, UserId};
    use hubcast_test_utils::MockPlatform;
    use rusqlite::params;
    use tempfile::tempdir;

    async fn register_at(db: &Database, id: i64, registered_at: String) {
        queries::chats::upsert(db, ChatId(id), ChatKind::Private, None, None)
            .await
            .unwrap();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE chats SET registered_at = ?2 WHERE chat_id = ?1",
                    params![id, registered_at],
                )?;
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reminds_expiring_trials_once() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reminders.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let platform = Arc::new(MockPlatform::new());
        let reminder = TrialReminder {
            db: db.clone(),
            store: Arc::new(MemoryStore::new()),
            platform: platform.clone(),
            trial_days: 30,
            admin_chat_ids: vec![],
        };

        // Trial ends in 3 days: registered 27 days ago (middle of the bucket).
        register_at(
            &db,
            100,
            iso(Utc::now() - chrono::Duration::days(27) + chrono::Duration::hours(2)),
        )
        .await;
        // Fresh chat: no reminder bucket matches.
        register_at(&db, 200, iso(Utc::now() - chrono::Duration::days(1))).await;

        reminder.run_once().await.unwrap();
        let sent = platform.sent_to(ChatId(100)).await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].body.as_deref().unwrap().contains("3 days"));
        assert!(platform.sent_to(ChatId(200)).await.is_empty());

        // Second pass the same day repeats nothing.
        reminder.run_once().await.unwrap();
        assert_eq!(platform.sent_to(ChatId(100)).await.len(), 1);
    }

    #[tokio::test]
    async fn paid_chats_are_not_reminded() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reminders_paid.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let platform = Arc::new(MockPlatform::new());
        let reminder = TrialReminder {
            db: db.clone(),
            store: Arc::new(MemoryStore::new()),
            platform: platform.clone(),
            trial_days: 30,
            admin_chat_ids: vec![],
        };

        register_at(
            &db,
            100,
            iso(Utc::now() - chrono::Duration::days(29) + chrono::Duration::hours(2)),
        )
        .await;
        queries::subscriptions::add(
            &db,
            ChatId(100),
            UserId(7),
            "month".into(),
            750,
            iso(Utc::now()),
            iso(Utc::now() + chrono::Duration::days(30)),
            "charge-1".into(),
        )
        .await
        .unwrap();

        reminder.run_once().await.unwrap();
        assert_eq!(platform.sent_count().await, 0);
    }
}
