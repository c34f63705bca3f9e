// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed [`FastStore`] implementation.
//!
//! Required when more than one engine process runs against the same bot
//! token: the token bucket, cooldowns, and dedup markers must be shared
//! for the pacing invariants to hold across processes. Every operation
//! maps to a single Redis command (or one atomic pipeline), so the
//! test-and-set semantics match the in-process store exactly.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

use hubcast_core::{FastStore, FastStoreError};

/// Fast store backed by a Redis server.
///
/// Cheap to clone; all clones multiplex over one managed connection that
/// reconnects automatically.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, FastStoreError> {
        let client = redis::Client::open(url).map_err(map_err)?;
        let manager = client.get_connection_manager().await.map_err(map_err)?;
        info!(url, "connected to redis");
        Ok(Self { manager })
    }
}

fn map_err(e: redis::RedisError) -> FastStoreError {
    FastStoreError(e.to_string())
}

fn ttl_secs(ttl: Duration) -> u64 {
    // Redis EX takes whole seconds; never round a positive TTL down to zero.
    ttl.as_secs().max(1)
}

#[async_trait]
impl FastStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, FastStoreError> {
        let mut con = self.manager.clone();
        con.get(key).await.map_err(map_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), FastStoreError> {
        let mut con = self.manager.clone();
        con.set_ex(key, value, ttl_secs(ttl)).await.map_err(map_err)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, FastStoreError> {
        let mut con = self.manager.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut con)
            .await
            .map_err(map_err)?;
        Ok(reply.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), FastStoreError> {
        let mut con = self.manager.clone();
        con.del(key).await.map_err(map_err)
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, FastStoreError> {
        let mut con = self.manager.clone();
        let count: i64 = con.incr(key, 1).await.map_err(map_err)?;
        if count == 1 {
            let _: bool = con
                .expire(key, ttl_secs(ttl) as i64)
                .await
                .map_err(map_err)?;
        }
        Ok(count)
    }

    async fn zset_add(
        &self,
        key: &str,
        member: &str,
        score: f64,
        ttl: Duration,
    ) -> Result<(), FastStoreError> {
        let mut con = self.manager.clone();
        let _: i64 = con.zadd(key, member, score).await.map_err(map_err)?;
        let _: bool = con
            .expire(key, ttl_secs(ttl) as i64)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn zset_remove_below(&self, key: &str, min_score: f64) -> Result<(), FastStoreError> {
        let mut con = self.manager.clone();
        let _: i64 = con
            .zrembyscore(key, "-inf", format!("({min_score}"))
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn zset_len(&self, key: &str) -> Result<u64, FastStoreError> {
        let mut con = self.manager.clone();
        con.zcard(key).await.map_err(map_err)
    }

    async fn zset_min_score(&self, key: &str) -> Result<Option<f64>, FastStoreError> {
        let mut con = self.manager.clone();
        let oldest: Vec<(String, f64)> = con
            .zrange_withscores(key, 0, 0)
            .await
            .map_err(map_err)?;
        Ok(oldest.first().map(|(_, score)| *score))
    }

    async fn list_push(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), FastStoreError> {
        let mut con = self.manager.clone();
        let _: i64 = con.rpush(key, value).await.map_err(map_err)?;
        let _: bool = con
            .expire(key, ttl_secs(ttl) as i64)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn list_take(&self, key: &str) -> Result<Vec<String>, FastStoreError> {
        let mut con = self.manager.clone();
        let (values, _deleted): (Vec<String>, i64) = redis::pipe()
            .atomic()
            .lrange(key, 0, -1)
            .del(key)
            .query_async(&mut con)
            .await
            .map_err(map_err)?;
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_malformed_url() {
        let result = RedisStore::connect("not a url").await;
        assert!(result.is_err());
    }

    #[test]
    fn positive_sub_second_ttls_round_up() {
        assert_eq!(ttl_secs(Duration::from_millis(300)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(2)), 2);
    }
}
