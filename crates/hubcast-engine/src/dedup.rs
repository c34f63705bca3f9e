// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Content fingerprints and the duplicate-suppression check.
//!
//! Media is identified by the platform's stable unique id, text by a hash
//! of its normalized form, and albums by a hash over their members'
//! fingerprints in album order. Markers live in the fast store for 24 h,
//! keyed per source chat, so the same content may still be posted in a
//! different source chat.

use std::time::Duration;

use sha2::{Digest, Sha256};
use unicode_normalization::UnicodeNormalization;

use hubcast_core::{FastStore, FastStoreError, MessagePayload, NormalizedMessage};

/// How long a seen fingerprint suppresses re-delivery.
pub const DEDUP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// First 32 hex chars of SHA-256 over the NFC-normalized text with
/// trailing whitespace stripped.
pub fn text_hash(text: &str) -> String {
    let normalized: String = text.nfc().collect();
    let digest = Sha256::digest(normalized.trim_end().as_bytes());
    hex::encode(digest)[..32].to_string()
}

/// Compute the content fingerprint, or `None` when the message carries
/// nothing fingerprintable (empty album).
pub fn fingerprint(msg: &NormalizedMessage) -> Option<String> {
    match &msg.payload {
        MessagePayload::Text { body } => Some(format!("text:{}", text_hash(body))),
        MessagePayload::Media { media, .. } => {
            Some(format!("media:{}", media.file_unique_id))
        }
        MessagePayload::Album { parts } => {
            if parts.is_empty() {
                return None;
            }
            let mut hasher = Sha256::new();
            for part in parts {
                hasher.update(fingerprint(part)?.as_bytes());
            }
            Some(format!("album:{}", &hex::encode(hasher.finalize())[..32]))
        }
    }
}

/// Atomically test-and-set the dedup marker for this message.
///
/// Returns `true` when the marker already existed, i.e. the caller must
/// drop the message. Unfingerprintable messages are never duplicates.
pub async fn is_duplicate(
    store: &dyn FastStore,
    msg: &NormalizedMessage,
) -> Result<bool, FastStoreError> {
    let Some(fp) = fingerprint(msg) else {
        return Ok(false);
    };
    let key = format!("dedup:{}:{}", msg.source_chat.0, fp);
    let created = store.set_if_absent(&key, "1", DEDUP_TTL).await?;
    Ok(!created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcast_core::{ChatId, MemoryStore, MessageId};
    use hubcast_test_utils::fixtures::{photo_message, text_message};

    #[test]
    fn text_hash_ignores_trailing_whitespace() {
        assert_eq!(text_hash("hello"), text_hash("hello  \n"));
        assert_ne!(text_hash("hello"), text_hash("  hello"));
        assert_eq!(text_hash("x").len(), 32);
    }

    #[test]
    fn text_hash_is_nfc_stable() {
        // U+00E9 vs e + U+0301 normalize to the same NFC form.
        assert_eq!(text_hash("caf\u{e9}"), text_hash("cafe\u{301}"));
    }

    #[test]
    fn media_fingerprint_uses_unique_id() {
        let msg = photo_message(100, 1, 7, "AAA", Some("caption ignored"));
        assert_eq!(fingerprint(&msg).as_deref(), Some("media:AAA"));
    }

    #[test]
    fn album_fingerprint_is_order_sensitive() {
        let a = photo_message(100, 1, 7, "AAA", None);
        let b = photo_message(100, 2, 7, "BBB", None);

        let mut album = text_message(100, 1, 7, "");
        album.payload = MessagePayload::Album {
            parts: vec![a.clone(), b.clone()],
        };
        let mut reversed = album.clone();
        reversed.payload = MessagePayload::Album {
            parts: vec![b, a],
        };

        let fp = fingerprint(&album).unwrap();
        assert!(fp.starts_with("album:"));
        assert_ne!(fp, fingerprint(&reversed).unwrap());

        let mut empty = album.clone();
        empty.payload = MessagePayload::Album { parts: Vec::new() };
        assert!(fingerprint(&empty).is_none());
    }

    #[tokio::test]
    async fn duplicate_is_suppressed_per_source_chat() {
        let store = MemoryStore::new();
        let msg = photo_message(100, 1, 7, "AAA", None);
        assert!(!is_duplicate(&store, &msg).await.unwrap());
        assert!(is_duplicate(&store, &msg).await.unwrap());

        // The same content from another source chat is not a duplicate.
        let mut other = photo_message(100, 2, 7, "AAA", None);
        other.source_chat = ChatId(999);
        other.source_message = MessageId(2);
        assert!(!is_duplicate(&store, &other).await.unwrap());
    }
}
