// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The paywall gate: cached entitlement checks, the missed-message
//! counter, and nudge rate limiting.
//!
//! A chat is entitled while its registration trial is running or a paid
//! subscription row is unexpired. Cache failures degrade to database
//! reads, never to suppressed delivery.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::debug;

use hubcast_core::{ChatId, FastStore, HubcastError};
use hubcast_storage::{parse_iso, queries, Database};

const ENTITLED_CACHE_TTL: Duration = Duration::from_secs(300);
const NUDGE_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);
const MISSED_TTL: Duration = Duration::from_secs(2 * 24 * 60 * 60);

/// Entitlement and nudge decisions for the distributor.
pub struct Paywall {
    db: Database,
    store: Arc<dyn FastStore>,
    trial_days: i64,
    admin_chat_ids: Vec<i64>,
}

impl Paywall {
    pub fn new(
        db: Database,
        store: Arc<dyn FastStore>,
        trial_days: i64,
        admin_chat_ids: Vec<i64>,
    ) -> Self {
        Self {
            db,
            store,
            trial_days,
            admin_chat_ids,
        }
    }

    /// Whether `chat` may fan out right now.
    ///
    /// `registered_at` anchors the trial window. Answers are cached for
    /// five minutes under `entitled:{chat}`.
    pub async fn is_entitled(
        &self,
        chat: ChatId,
        registered_at: &str,
    ) -> Result<bool, HubcastError> {
        let cache_key = format!("entitled:{}", chat.0);

        // Admin chats never need a subscription.
        if self.admin_chat_ids.contains(&chat.0) {
            self.cache(&cache_key, true).await;
            return Ok(true);
        }

        if let Ok(Some(cached)) = self.store.get(&cache_key).await {
            return Ok(cached == "1");
        }

        // Trial first: no database round-trip while it lasts.
        if let Some(registered) = parse_iso(registered_at) {
            if Utc::now() < registered + chrono::Duration::days(self.trial_days) {
                self.cache(&cache_key, true).await;
                return Ok(true);
            }
        }

        let entitled = queries::subscriptions::active_subscription(&self.db, chat)
            .await?
            .is_some();
        self.cache(&cache_key, entitled).await;
        Ok(entitled)
    }

    /// Drop the cached answer after a purchase or grant.
    pub async fn invalidate(&self, chat: ChatId) {
        let _ = self.store.delete(&format!("entitled:{}", chat.0)).await;
    }

    /// Count one suppressed message for today and return the new total.
    pub async fn record_missed(&self, chat: ChatId) -> i64 {
        let key = missed_key(chat);
        match self.store.incr(&key, MISSED_TTL).await {
            Ok(count) => count,
            Err(e) => {
                debug!(chat_id = chat.0, error = %e, "missed counter unavailable");
                0
            }
        }
    }

    /// Messages suppressed for `chat` so far today (for nudge copy).
    pub async fn missed_today(&self, chat: ChatId) -> i64 {
        match self.store.get(&missed_key(chat)).await {
            Ok(Some(count)) => count.parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Whether a nudge may go out now. A `true` answer also arms the 24 h
    /// cooldown, so the caller just sends.
    pub async fn should_nudge(&self, chat: ChatId) -> bool {
        let key = format!("nudge:{}", chat.0);
        self.store
            .set_if_absent(&key, "1", NUDGE_COOLDOWN)
            .await
            .unwrap_or(false)
    }

    async fn cache(&self, key: &str, entitled: bool) {
        let value = if entitled { "1" } else { "0" };
        if let Err(e) = self.store.set(key, value, ENTITLED_CACHE_TTL).await {
            debug!(key, error = %e, "entitlement cache write failed");
        }
    }
}

fn missed_key(chat: ChatId) -> String {
    format!("missed:{}:{}", chat.0, Utc::now().format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use hubcast_core::{MemoryStore, UserId};
    use hubcast_storage::iso;
    use tempfile::tempdir;

    async fn setup(trial_days: i64, admins: Vec<i64>) -> (Paywall, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("paywall.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let paywall = Paywall::new(db.clone(), Arc::new(MemoryStore::new()), trial_days, admins);
        (paywall, db, dir)
    }

    #[tokio::test]
    async fn fresh_registration_is_in_trial() {
        let (paywall, _db, _dir) = setup(30, vec![]).await;
        let registered = iso(Utc::now() - ChronoDuration::days(5));
        assert!(paywall.is_entitled(ChatId(100), &registered).await.unwrap());
    }

    #[tokio::test]
    async fn expired_trial_without_subscription_is_not_entitled() {
        let (paywall, _db, _dir) = setup(30, vec![]).await;
        let registered = iso(Utc::now() - ChronoDuration::days(45));
        assert!(!paywall.is_entitled(ChatId(100), &registered).await.unwrap());
    }

    #[tokio::test]
    async fn subscription_restores_entitlement_after_invalidate() {
        let (paywall, db, _dir) = setup(30, vec![]).await;
        let registered = iso(Utc::now() - ChronoDuration::days(45));
        assert!(!paywall.is_entitled(ChatId(100), &registered).await.unwrap());

        queries::subscriptions::add(
            &db,
            ChatId(100),
            UserId(7),
            "month".into(),
            750,
            iso(Utc::now()),
            iso(Utc::now() + ChronoDuration::days(30)),
            "charge-1".into(),
        )
        .await
        .unwrap();

        // The negative answer is cached until invalidated.
        assert!(!paywall.is_entitled(ChatId(100), &registered).await.unwrap());
        paywall.invalidate(ChatId(100)).await;
        assert!(paywall.is_entitled(ChatId(100), &registered).await.unwrap());
    }

    #[tokio::test]
    async fn admin_chats_bypass_the_paywall() {
        let (paywall, _db, _dir) = setup(0, vec![42]).await;
        let long_ago = iso(Utc::now() - ChronoDuration::days(400));
        assert!(paywall.is_entitled(ChatId(42), &long_ago).await.unwrap());
    }

    #[tokio::test]
    async fn nudge_fires_once_per_cooldown() {
        let (paywall, _db, _dir) = setup(30, vec![]).await;
        assert!(paywall.should_nudge(ChatId(100)).await);
        assert!(!paywall.should_nudge(ChatId(100)).await);
        // Independent per chat.
        assert!(paywall.should_nudge(ChatId(200)).await);
    }

    #[tokio::test]
    async fn missed_counter_accumulates() {
        let (paywall, _db, _dir) = setup(30, vec![]).await;
        assert_eq!(paywall.missed_today(ChatId(100)).await, 0);
        assert_eq!(paywall.record_missed(ChatId(100)).await, 1);
        assert_eq!(paywall.record_missed(ChatId(100)).await, 2);
        assert_eq!(paywall.missed_today(ChatId(100)).await, 2);
    }
}
