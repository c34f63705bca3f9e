// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Album buffering: gather media-group parts into one atomic album.
//!
//! Parts arrive as separate messages sharing an album id. Each part is
//! appended to a fast-store list and (re)arms a per-album idle timer;
//! when the timer fires the parts flush as one `Album` message through
//! the distributor. A hard deadline caps buffering at five seconds from
//! the first part regardless of idleness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use hubcast_core::{FastStore, HubcastError, MessagePayload, NormalizedMessage};

use crate::dedup;
use crate::distributor::Distributor;

/// Flush after this long without a new part.
pub const IDLE_FLUSH: Duration = Duration::from_secs(1);
/// Flush no later than this long after the first part.
pub const HARD_DEADLINE: Duration = Duration::from_secs(5);

struct PendingAlbum {
    timer: JoinHandle<()>,
    first_seen: Instant,
}

/// Fast-store backed album accumulator with per-album flush timers.
///
/// Cheap to clone; all clones share the buffered state and timers.
#[derive(Clone)]
pub struct AlbumBuffer {
    store: Arc<dyn FastStore>,
    distributor: Arc<Distributor>,
    pending: Arc<Mutex<HashMap<String, PendingAlbum>>>,
}

impl AlbumBuffer {
    pub fn new(store: Arc<dyn FastStore>, distributor: Arc<Distributor>) -> Self {
        Self {
            store,
            distributor,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Buffer one album part and re-arm the flush timer.
    pub async fn add(&self, msg: NormalizedMessage) -> Result<(), HubcastError> {
        let Some(album_id) = msg.album_id.clone() else {
            // Not an album part; the caller routed it here by mistake.
            return self.distributor.distribute(msg).await;
        };

        let serialized = serde_json::to_string(&msg)
            .map_err(|e| HubcastError::Internal(format!("album part serialization: {e}")))?;
        self.store
            .list_push(&buffer_key(&album_id), &serialized, HARD_DEADLINE)
            .await?;

        self.arm_timer(album_id);
        Ok(())
    }

    fn arm_timer(&self, album_id: String) {
        let mut pending = self.pending.lock().expect("album state poisoned");
        let now = Instant::now();
        let first_seen = match pending.remove(&album_id) {
            Some(prev) => {
                prev.timer.abort();
                prev.first_seen
            }
            None => now,
        };

        let deadline = first_seen + HARD_DEADLINE;
        let delay = IDLE_FLUSH.min(deadline.saturating_duration_since(now));

        let buffer = self.clone();
        let id = album_id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = buffer.flush(&id).await {
                error!(album_id = %id, error = %e, "album flush failed");
            }
        });
        pending.insert(album_id, PendingAlbum { timer, first_seen });
    }

    /// Drain one album and hand it to the distributor as a single message.
    async fn flush(&self, album_id: &str) -> Result<(), HubcastError> {
        self.pending
            .lock()
            .expect("album state poisoned")
            .remove(album_id);

        let raw = self.store.list_take(&buffer_key(album_id)).await?;
        if raw.is_empty() {
            return Ok(());
        }

        let mut parts: Vec<NormalizedMessage> = Vec::with_capacity(raw.len());
        for item in raw {
            match serde_json::from_str(&item) {
                Ok(part) => parts.push(part),
                Err(e) => warn!(album_id, error = %e, "skipping corrupt album part"),
            }
        }
        if parts.is_empty() {
            return Ok(());
        }
        parts.sort_by_key(|p| p.source_message.0);

        info!(album_id, parts = parts.len(), "flushing album");
        let first = &parts[0];
        let composite = NormalizedMessage {
            source_chat: first.source_chat,
            source_message: first.source_message,
            source_user: first.source_user,
            album_id: Some(album_id.to_string()),
            reply_to: first.reply_to,
            received_at: first.received_at,
            payload: MessagePayload::Album { parts },
        };

        // Dedup applies to the assembled album, not its individual parts.
        if dedup::is_duplicate(self.store.as_ref(), &composite).await? {
            debug!(album_id, "dropping duplicate album");
            return Ok(());
        }
        self.distributor.distribute(composite).await
    }

    /// Abort all pending flush timers. Buffered parts stay in the fast
    /// store until their TTL runs out.
    pub fn shutdown(&self) {
        let mut pending = self.pending.lock().expect("album state poisoned");
        for (_, album) in pending.drain() {
            album.timer.abort();
        }
    }
}

fn buffer_key(album_id: &str) -> String {
    format!("albums:{album_id}")
}
