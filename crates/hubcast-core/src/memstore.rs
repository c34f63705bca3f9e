// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process [`FastStore`] implementation.
//!
//! Suitable for single-process deployments and tests; multi-process
//! deployments use the Redis-backed store so pacing state is shared.
//! Expiry is enforced lazily on access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::FastStoreError;
use crate::traits::FastStore;

#[derive(Default)]
struct Inner {
    kv: HashMap<String, (String, Instant)>,
    zsets: HashMap<String, (Vec<(String, f64)>, Instant)>,
    lists: HashMap<String, (Vec<String>, Instant)>,
}

impl Inner {
    fn live_kv(&mut self, key: &str) -> Option<&mut (String, Instant)> {
        let expired = self
            .kv
            .get(key)
            .is_some_and(|(_, deadline)| *deadline <= Instant::now());
        if expired {
            self.kv.remove(key);
        }
        self.kv.get_mut(key)
    }
}

fn expire_zset(inner: &mut Inner, key: &str) {
    let expired = inner
        .zsets
        .get(key)
        .is_some_and(|(_, deadline)| *deadline <= Instant::now());
    if expired {
        inner.zsets.remove(key);
    }
}

/// In-memory fast store backed by a single async mutex.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FastStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FastStoreError> {
        let mut inner = self.inner.lock().await;
        Ok(inner.live_kv(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), FastStoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .kv
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, FastStoreError> {
        let mut inner = self.inner.lock().await;
        if inner.live_kv(key).is_some() {
            return Ok(false);
        }
        inner
            .kv
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), FastStoreError> {
        let mut inner = self.inner.lock().await;
        inner.kv.remove(key);
        inner.zsets.remove(key);
        inner.lists.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, FastStoreError> {
        let mut inner = self.inner.lock().await;
        match inner.live_kv(key) {
            Some((value, _)) => {
                let next = value
                    .parse::<i64>()
                    .map_err(|e| FastStoreError(format!("counter {key} corrupt: {e}")))?
                    + 1;
                *value = next.to_string();
                Ok(next)
            }
            None => {
                inner
                    .kv
                    .insert(key.to_string(), ("1".to_string(), Instant::now() + ttl));
                Ok(1)
            }
        }
    }

    async fn zset_add(
        &self,
        key: &str,
        member: &str,
        score: f64,
        ttl: Duration,
    ) -> Result<(), FastStoreError> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let entry = inner
            .zsets
            .entry(key.to_string())
            .or_insert_with(|| (Vec::new(), now + ttl));
        if entry.1 <= now {
            entry.0.clear();
        }
        entry.0.retain(|(m, _)| m != member);
        entry.0.push((member.to_string(), score));
        entry.1 = now + ttl;
        Ok(())
    }

    async fn zset_remove_below(&self, key: &str, min_score: f64) -> Result<(), FastStoreError> {
        let mut inner = self.inner.lock().await;
        expire_zset(&mut inner, key);
        if let Some((members, _)) = inner.zsets.get_mut(key) {
            members.retain(|(_, score)| *score >= min_score);
        }
        Ok(())
    }

    async fn zset_len(&self, key: &str) -> Result<u64, FastStoreError> {
        let mut inner = self.inner.lock().await;
        expire_zset(&mut inner, key);
        Ok(inner
            .zsets
            .get(key)
            .map_or(0, |(members, _)| members.len() as u64))
    }

    async fn zset_min_score(&self, key: &str) -> Result<Option<f64>, FastStoreError> {
        let mut inner = self.inner.lock().await;
        expire_zset(&mut inner, key);
        Ok(inner.zsets.get(key).and_then(|(members, _)| {
            members
                .iter()
                .map(|(_, score)| *score)
                .fold(None, |acc: Option<f64>, s| {
                    Some(acc.map_or(s, |a| a.min(s)))
                })
        }))
    }

    async fn list_push(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), FastStoreError> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        let entry = inner
            .lists
            .entry(key.to_string())
            .or_insert_with(|| (Vec::new(), now + ttl));
        if entry.1 <= now {
            entry.0.clear();
        }
        entry.0.push(value.to_string());
        entry.1 = now + ttl;
        Ok(())
    }

    async fn list_take(&self, key: &str) -> Result<Vec<String>, FastStoreError> {
        let mut inner = self.inner.lock().await;
        match inner.lists.remove(key) {
            Some((values, deadline)) if deadline > Instant::now() => Ok(values),
            _ => Ok(Vec::new()),
        }
    }
}
