// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Send pacing: global token bucket, per-chat cooldowns, and the
//! failure-triggered circuit breakers.
//!
//! Pacing state (bucket ticks, last-send marks) lives in the fast store so
//! several engine processes sharing one bot token stay under the platform
//! budget together. Breaker state is in-process: it tracks this engine's
//! own consecutive failures.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::time::sleep;
use tracing::warn;

use hubcast_core::{ChatId, ChatKind, FastStore, FastStoreError};

/// Sorted set of send ticks within the rolling window.
const GLOBAL_BUCKET_KEY: &str = "ratelimit:global";
/// Width of the rolling send window.
const WINDOW_MS: i64 = 1000;

/// Consecutive errors to one destination before its breaker opens.
const CHAT_TRIP_THRESHOLD: u32 = 3;
/// How long a tripped destination stays suppressed.
const CHAT_TRIP_PAUSE: Duration = Duration::from_secs(300);
/// Rate-limit rejections within [`GLOBAL_429_WINDOW`] before the global pause.
const GLOBAL_429_THRESHOLD: usize = 5;
const GLOBAL_429_WINDOW: Duration = Duration::from_secs(60);
/// Length of the global pause once tripped.
const GLOBAL_PAUSE: Duration = Duration::from_secs(30);

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[derive(Default)]
struct BreakerState {
    chat_errors: HashMap<i64, u32>,
    chat_paused_until: HashMap<i64, Instant>,
    global_429: Vec<Instant>,
    global_paused_until: Option<Instant>,
}

/// Dual-layer rate limiter with circuit breakers.
pub struct RateLimiter {
    store: Arc<dyn FastStore>,
    global_limit: u64,
    state: Mutex<BreakerState>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn FastStore>, global_limit: u64) -> Self {
        Self {
            store,
            global_limit,
            state: Mutex::new(BreakerState::default()),
        }
    }

    /// Minimum spacing between consecutive sends to one destination.
    pub fn cooldown_for(kind: ChatKind) -> Duration {
        match kind {
            ChatKind::Group | ChatKind::Supergroup => Duration::from_secs(3),
            ChatKind::Private | ChatKind::Channel => Duration::from_secs(1),
        }
    }

    /// Block until a send to `chat` is within budget: waits out any global
    /// pause, takes a global token, then the per-chat cooldown slot.
    pub async fn acquire(&self, chat: ChatId, kind: ChatKind) -> Result<(), FastStoreError> {
        if let Some(remaining) = self.global_pause_remaining() {
            warn!(wait_ms = remaining.as_millis() as u64, "global pause active");
            sleep(remaining).await;
        }
        self.acquire_global_token().await?;
        self.acquire_chat_cooldown(chat, Self::cooldown_for(kind)).await?;
        Ok(())
    }

    async fn acquire_global_token(&self) -> Result<(), FastStoreError> {
        loop {
            let now = now_ms();
            self.store
                .zset_remove_below(GLOBAL_BUCKET_KEY, (now - WINDOW_MS) as f64)
                .await?;
            let count = self.store.zset_len(GLOBAL_BUCKET_KEY).await?;
            if count < self.global_limit {
                self.store
                    .zset_add(
                        GLOBAL_BUCKET_KEY,
                        &uuid::Uuid::new_v4().to_string(),
                        now as f64,
                        Duration::from_secs(2),
                    )
                    .await?;
                return Ok(());
            }

            // Bucket full: wait for the oldest tick to age out of the window.
            let wait_ms = match self.store.zset_min_score(GLOBAL_BUCKET_KEY).await? {
                Some(oldest) => ((oldest + WINDOW_MS as f64) - now as f64).max(50.0),
                None => 50.0,
            };
            sleep(Duration::from_millis(wait_ms as u64)).await;
        }
    }

    async fn acquire_chat_cooldown(
        &self,
        chat: ChatId,
        cooldown: Duration,
    ) -> Result<(), FastStoreError> {
        let key = format!("cooldown:{}", chat.0);
        let cooldown_ms = cooldown.as_millis() as i64;
        loop {
            match self.store.get(&key).await? {
                None => break,
                Some(last) => {
                    let last: i64 = last.parse().unwrap_or(0);
                    let elapsed = now_ms() - last;
                    if elapsed >= cooldown_ms {
                        break;
                    }
                    sleep(Duration::from_millis((cooldown_ms - elapsed) as u64)).await;
                }
            }
        }
        self.store
            .set(&key, &now_ms().to_string(), cooldown + Duration::from_secs(2))
            .await?;
        Ok(())
    }

    /// Remaining pause for a tripped destination, if its breaker is open.
    pub fn breaker_delay(&self, chat: ChatId) -> Option<Duration> {
        let state = self.state.lock().expect("breaker state poisoned");
        let until = state.chat_paused_until.get(&chat.0)?;
        until.checked_duration_since(Instant::now())
    }

    /// Remaining global pause after a burst of platform rate-limit
    /// rejections, if active.
    pub fn global_pause_remaining(&self) -> Option<Duration> {
        let state = self.state.lock().expect("breaker state poisoned");
        state
            .global_paused_until
            .and_then(|until| until.checked_duration_since(Instant::now()))
    }

    /// A send to `chat` succeeded: close its error streak.
    pub fn report_success(&self, chat: ChatId) {
        let mut state = self.state.lock().expect("breaker state poisoned");
        state.chat_errors.remove(&chat.0);
    }

    /// A send to `chat` failed. At three consecutive failures the
    /// destination trips for five minutes; returns `true` when this call
    /// tripped it.
    pub fn report_error(&self, chat: ChatId) -> bool {
        let mut state = self.state.lock().expect("breaker state poisoned");
        let errors = state.chat_errors.entry(chat.0).or_insert(0);
        *errors += 1;
        if *errors >= CHAT_TRIP_THRESHOLD {
            state.chat_errors.remove(&chat.0);
            state
                .chat_paused_until
                .insert(chat.0, Instant::now() + CHAT_TRIP_PAUSE);
            warn!(chat_id = chat.0, "circuit breaker: destination paused for 5 minutes");
            return true;
        }
        false
    }

    /// The platform rejected a send for pacing. Five rejections within a
    /// minute trip a 30 s global pause; returns `true` when this call
    /// tripped it.
    pub fn report_429(&self) -> bool {
        let mut state = self.state.lock().expect("breaker state poisoned");
        let now = Instant::now();
        state.global_429.push(now);
        state
            .global_429
            .retain(|t| now.duration_since(*t) < GLOBAL_429_WINDOW);
        if state.global_429.len() >= GLOBAL_429_THRESHOLD {
            state.global_429.clear();
            state.global_paused_until = Some(now + GLOBAL_PAUSE);
            warn!("circuit breaker: global pause for 30 seconds");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcast_core::MemoryStore;

    fn limiter(global_limit: u64) -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryStore::new()), global_limit)
    }

    #[test]
    fn cooldown_depends_on_chat_kind() {
        assert_eq!(
            RateLimiter::cooldown_for(ChatKind::Private),
            Duration::from_secs(1)
        );
        assert_eq!(
            RateLimiter::cooldown_for(ChatKind::Channel),
            Duration::from_secs(1)
        );
        assert_eq!(
            RateLimiter::cooldown_for(ChatKind::Group),
            Duration::from_secs(3)
        );
        assert_eq!(
            RateLimiter::cooldown_for(ChatKind::Supergroup),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn chat_breaker_trips_on_third_consecutive_error() {
        let limiter = limiter(25);
        let chat = ChatId(200);
        assert!(!limiter.report_error(chat));
        assert!(!limiter.report_error(chat));
        assert!(limiter.breaker_delay(chat).is_none());
        assert!(limiter.report_error(chat));
        assert!(limiter.breaker_delay(chat).unwrap() > Duration::from_secs(290));
    }

    #[test]
    fn success_resets_the_error_streak() {
        let limiter = limiter(25);
        let chat = ChatId(200);
        limiter.report_error(chat);
        limiter.report_error(chat);
        limiter.report_success(chat);
        assert!(!limiter.report_error(chat));
        assert!(!limiter.report_error(chat));
        assert!(limiter.report_error(chat), "streak restarts after reset");
    }

    #[test]
    fn global_breaker_trips_on_fifth_429() {
        let limiter = limiter(25);
        for _ in 0..4 {
            assert!(!limiter.report_429());
            assert!(limiter.global_pause_remaining().is_none());
        }
        assert!(limiter.report_429());
        assert!(limiter.global_pause_remaining().unwrap() > Duration::from_secs(25));
    }

    #[tokio::test]
    async fn global_tokens_cap_the_window() {
        let limiter = limiter(3);
        let chat_a = ChatId(1);
        // Distinct chats so the per-chat cooldown doesn't interfere
        // (first send to a chat has no cooldown mark).
        let started = Instant::now();
        for i in 0..3 {
            limiter
                .acquire(ChatId(chat_a.0 + i), ChatKind::Private)
                .await
                .unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(500));

        // Fourth acquire must wait for the window to roll.
        limiter.acquire(ChatId(99), ChatKind::Private).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(900));
    }

    #[tokio::test]
    async fn per_chat_cooldown_spaces_consecutive_sends() {
        let limiter = limiter(100);
        let chat = ChatId(5);
        limiter.acquire(chat, ChatKind::Private).await.unwrap();
        let started = Instant::now();
        limiter.acquire(chat, ChatKind::Private).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(900));
    }
}
