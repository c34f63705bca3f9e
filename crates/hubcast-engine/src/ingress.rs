// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The content entry point: restriction gate, source check, album
//! routing, dedup, then dispatch.
//!
//! The adapter has already filtered the bot's own messages and produced a
//! [`NormalizedMessage`]; everything here is platform-independent.

use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;

use hubcast_core::{EditMode, FastStore, HubcastError, NormalizedMessage};
use hubcast_storage::{queries, Database};

use crate::album::AlbumBuffer;
use crate::dedup;
use crate::distributor::Distributor;
use crate::moderation;

/// Ingress pipeline for new and edited content.
pub struct Ingress {
    db: Database,
    store: Arc<dyn FastStore>,
    distributor: Arc<Distributor>,
    albums: AlbumBuffer,
}

impl Ingress {
    pub fn new(
        db: Database,
        store: Arc<dyn FastStore>,
        distributor: Arc<Distributor>,
        albums: AlbumBuffer,
    ) -> Self {
        Self {
            db,
            store,
            distributor,
            albums,
        }
    }

    /// Handle a new content message.
    pub async fn handle_message(&self, msg: NormalizedMessage) -> Result<(), HubcastError> {
        if self.sender_restricted(&msg).await? {
            return Ok(());
        }
        if !queries::chats::is_active_source(&self.db, msg.source_chat).await? {
            return Ok(());
        }

        // Album parts buffer first; dedup runs on the assembled album.
        if msg.album_id.is_some() {
            return self.albums.add(msg).await;
        }

        if dedup::is_duplicate(self.store.as_ref(), &msg).await? {
            debug!(
                source_chat = msg.source_chat.0,
                source_message = msg.source_message.0,
                "dropping duplicate message"
            );
            return Ok(());
        }
        self.distributor.distribute(msg).await
    }

    /// Handle an edited message: redistributed as a fresh message when
    /// edit mode is `resend`, threaded to each destination's copy of the
    /// original. Edits bypass dedup (the edited content replaces, not
    /// repeats, the original).
    pub async fn handle_edit(&self, msg: NormalizedMessage) -> Result<(), HubcastError> {
        let mode = queries::config::get_value(&self.db, "edit_mode")
            .await?
            .and_then(|v| EditMode::from_str(&v).ok())
            .unwrap_or_default();
        if mode != EditMode::Resend {
            return Ok(());
        }

        if self.sender_restricted(&msg).await? {
            return Ok(());
        }
        if !queries::chats::is_active_source(&self.db, msg.source_chat).await? {
            return Ok(());
        }
        self.distributor.distribute_edit(msg).await
    }

    async fn sender_restricted(&self, msg: &NormalizedMessage) -> Result<bool, HubcastError> {
        let Some(user) = msg.source_user else {
            return Ok(false);
        };
        let restricted =
            moderation::is_user_restricted(&self.db, self.store.as_ref(), user).await?;
        if let Some(kind) = restricted {
            debug!(user_id = user.0, kind = %kind, "dropping message from restricted user");
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use hubcast_core::{ChatId, ChatKind, MemoryStore, PlatformClient, RestrictionKind, UserId};
    use hubcast_test_utils::fixtures::{photo_message, text_message};
    use hubcast_test_utils::MockPlatform;
    use tempfile::tempdir;

    use crate::alias::AliasService;
    use crate::distributor::SendTask;
    use crate::paywall::Paywall;

    struct Fixture {
        ingress: Ingress,
        db: Database,
        rx: mpsc::Receiver<SendTask>,
        _dir: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("ingress.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let platform: Arc<dyn PlatformClient> = Arc::new(MockPlatform::new());
        let (tx, rx) = mpsc::channel(64);

        queries::chats::upsert(&db, ChatId(100), ChatKind::Group, None, None)
            .await
            .unwrap();
        queries::chats::upsert(&db, ChatId(200), ChatKind::Private, None, None)
            .await
            .unwrap();

        let paywall = Paywall::new(db.clone(), store.clone(), 30, vec![]);
        let aliases = AliasService::new(db.clone(), store.clone()).await.unwrap();
        let distributor = Arc::new(Distributor::new(
            db.clone(),
            store.clone(),
            platform,
            paywall,
            aliases,
            tx,
        ));
        let albums = AlbumBuffer::new(store.clone(), distributor.clone());
        let ingress = Ingress::new(db.clone(), store, distributor, albums);
        Fixture {
            ingress,
            db,
            rx,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn unregistered_source_is_ignored() {
        let mut fx = setup().await;
        fx.ingress
            .handle_message(text_message(999, 1, 7, "hi"))
            .await
            .unwrap();
        assert!(fx.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn restricted_user_is_dropped_at_ingress() {
        let mut fx = setup().await;
        queries::restrictions::add(&fx.db, UserId(7), RestrictionKind::Mute, UserId(1), None)
            .await
            .unwrap();

        fx.ingress
            .handle_message(text_message(100, 1, 7, "hi"))
            .await
            .unwrap();
        assert!(fx.rx.try_recv().is_err());

        // Another user's messages still flow.
        fx.ingress
            .handle_message(text_message(100, 2, 8, "hi"))
            .await
            .unwrap();
        assert_eq!(fx.rx.try_recv().unwrap().dest_chat, ChatId(200));
    }

    #[tokio::test]
    async fn duplicate_submission_yields_one_wave() {
        let mut fx = setup().await;
        fx.ingress
            .handle_message(photo_message(100, 1, 7, "AAA", None))
            .await
            .unwrap();
        assert!(fx.rx.try_recv().is_ok());

        fx.ingress
            .handle_message(photo_message(100, 2, 7, "AAA", None))
            .await
            .unwrap();
        assert!(fx.rx.try_recv().is_err(), "second emission deduplicated");
    }

    #[tokio::test]
    async fn edits_follow_the_mode_cell() {
        let mut fx = setup().await;
        fx.ingress
            .handle_edit(text_message(100, 1, 7, "edited"))
            .await
            .unwrap();
        assert!(fx.rx.try_recv().is_err(), "edit mode defaults to off");

        queries::config::set_value(&fx.db, "edit_mode", "resend")
            .await
            .unwrap();
        fx.ingress
            .handle_edit(text_message(100, 1, 7, "edited"))
            .await
            .unwrap();
        assert_eq!(fx.rx.try_recv().unwrap().dest_chat, ChatId(200));
    }

    #[tokio::test]
    async fn edit_threads_to_prior_copy() {
        let mut fx = setup().await;
        queries::config::set_value(&fx.db, "edit_mode", "resend")
            .await
            .unwrap();
        // The original (100, 1) was already delivered to 200 as 500.
        queries::send_log::record(
            &fx.db,
            ChatId(100),
            hubcast_core::MessageId(1),
            Some(UserId(7)),
            ChatId(200),
            hubcast_core::MessageId(500),
        )
        .await
        .unwrap();

        fx.ingress
            .handle_edit(text_message(100, 1, 7, "edited"))
            .await
            .unwrap();
        let task = fx.rx.try_recv().unwrap();
        assert_eq!(task.reply_to, Some(hubcast_core::MessageId(500)));
    }
}
