// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fast-store trait: volatile shared state with TTLs and atomic test-and-set.
//!
//! Backs dedup markers, the global token bucket, album buffers, per-chat
//! cooldowns, nudge cooldowns, and the entitlement/alias/restriction caches.
//! Every operation is atomic with respect to other engine processes, so a
//! Redis-backed implementation makes the pacing state multi-process safe;
//! the in-process [`MemoryStore`](crate::memstore::MemoryStore) exposes the
//! same interface for single-process deployments.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::FastStoreError;

#[async_trait]
pub trait FastStore: Send + Sync {
    /// Read a key. Expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, FastStoreError>;

    /// Write a key with a TTL, overwriting any previous value.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), FastStoreError>;

    /// Atomic test-and-set: write only if the key is absent. Returns
    /// `true` if this call created the key.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, FastStoreError>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), FastStoreError>;

    /// Atomically increment a counter, creating it at 1 with `ttl` on
    /// first use. Returns the new value.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, FastStoreError>;

    // --- Sorted set (global token bucket) ---

    /// Add a member with a score, refreshing the set's TTL.
    async fn zset_add(
        &self,
        key: &str,
        member: &str,
        score: f64,
        ttl: Duration,
    ) -> Result<(), FastStoreError>;

    /// Remove all members with score strictly below `min_score`.
    async fn zset_remove_below(&self, key: &str, min_score: f64) -> Result<(), FastStoreError>;

    /// Number of members currently in the set.
    async fn zset_len(&self, key: &str) -> Result<u64, FastStoreError>;

    /// Smallest score in the set, if any.
    async fn zset_min_score(&self, key: &str) -> Result<Option<f64>, FastStoreError>;

    // --- List (album buffer) ---

    /// Append to a list, refreshing its TTL.
    async fn list_push(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), FastStoreError>;

    /// Atomically read and delete a whole list. Returns the elements in
    /// push order; empty if the key is absent or expired.
    async fn list_take(&self, key: &str) -> Result<Vec<String>, FastStoreError>;
}
