// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stable per-user pseudonyms.
//!
//! Aliases are derived deterministically from a per-install salt and the
//! user id, persisted on first use, and cached in the fast store. They
//! never change once issued.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::debug;

use hubcast_core::{FastStore, HubcastError, UserId};
use hubcast_storage::{queries, Database};

const ALIAS_CACHE_TTL: Duration = Duration::from_secs(300);
const ALIAS_CHARS: usize = 6;
const SALT_KEY: &str = "alias_salt";

/// Lowercase base32 alphabet (RFC 4648 without padding).
const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Issues and caches user aliases.
pub struct AliasService {
    db: Database,
    store: Arc<dyn FastStore>,
    salt: String,
}

impl AliasService {
    /// Build the service, creating and persisting the per-install salt on
    /// first run.
    pub async fn new(db: Database, store: Arc<dyn FastStore>) -> Result<Self, HubcastError> {
        let salt = match queries::config::get_value(&db, SALT_KEY).await? {
            Some(salt) => salt,
            None => {
                let mut bytes = [0u8; 16];
                rand::thread_rng().fill_bytes(&mut bytes);
                let salt = hex::encode(bytes);
                queries::config::set_value(&db, SALT_KEY, &salt).await?;
                debug!("created alias salt");
                salt
            }
        };
        Ok(Self { db, store, salt })
    }

    /// The alias for `user`, e.g. `u-a3x7k2`. Issued and persisted on
    /// first call; cached for subsequent calls.
    pub async fn alias_for(&self, user: UserId) -> Result<String, HubcastError> {
        let cache_key = format!("alias:{}", user.0);
        if let Ok(Some(cached)) = self.store.get(&cache_key).await {
            return Ok(cached);
        }

        let alias = match queries::aliases::get(&self.db, user).await? {
            Some(existing) => existing,
            None => {
                let derived = self.derive(user);
                // First writer wins; the stored value is authoritative.
                queries::aliases::insert(&self.db, user, derived).await?
            }
        };

        if let Err(e) = self.store.set(&cache_key, &alias, ALIAS_CACHE_TTL).await {
            debug!(user_id = user.0, error = %e, "alias cache write failed");
        }
        Ok(alias)
    }

    /// The suffix appended to outbound bodies, e.g. `— u-a3x7k2`.
    pub async fn tag_for(&self, user: UserId) -> Result<String, HubcastError> {
        Ok(format!("— {}", self.alias_for(user).await?))
    }

    fn derive(&self, user: UserId) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.salt.as_bytes());
        hasher.update(user.0.to_le_bytes());
        let digest = hasher.finalize();
        format!("u-{}", base32_prefix(&digest, ALIAS_CHARS))
    }
}

/// Encode the leading bits of `bytes` as `n` base32 characters.
fn base32_prefix(bytes: &[u8], n: usize) -> String {
    let mut out = String::with_capacity(n);
    let mut bit = 0usize;
    while out.len() < n {
        let byte = bit / 8;
        let offset = bit % 8;
        let mut index = ((bytes[byte] as usize) << 8 | bytes[byte + 1] as usize) >> (11 - offset);
        index &= 0x1f;
        out.push(ALPHABET[index] as char);
        bit += 5;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcast_core::MemoryStore;
    use tempfile::tempdir;

    async fn setup() -> (AliasService, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("alias.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let service = AliasService::new(db.clone(), Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        (service, db, dir)
    }

    #[test]
    fn base32_prefix_is_stable_and_lowercase() {
        let bytes = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04];
        let encoded = base32_prefix(&bytes, 6);
        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded, base32_prefix(&bytes, 6));
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn alias_shape_and_determinism() {
        let (service, _db, _dir) = setup().await;
        let alias = service.alias_for(UserId(7)).await.unwrap();
        assert!(alias.starts_with("u-"));
        assert_eq!(alias.len(), 2 + ALIAS_CHARS);
        // Same user, same alias; different user, different alias.
        assert_eq!(service.alias_for(UserId(7)).await.unwrap(), alias);
        assert_ne!(service.alias_for(UserId(8)).await.unwrap(), alias);
    }

    #[tokio::test]
    async fn alias_survives_service_rebuild() {
        let (service, db, _dir) = setup().await;
        let first = service.alias_for(UserId(42)).await.unwrap();

        // New service instance over the same database re-reads the salt,
        // so the persisted alias is returned unchanged.
        let rebuilt = AliasService::new(db, Arc::new(MemoryStore::new()))
            .await
            .unwrap();
        assert_eq!(rebuilt.alias_for(UserId(42)).await.unwrap(), first);
    }

    #[tokio::test]
    async fn tag_format() {
        let (service, _db, _dir) = setup().await;
        let tag = service.tag_for(UserId(7)).await.unwrap();
        assert!(tag.starts_with("— u-"));
    }
}
