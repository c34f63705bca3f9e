// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out: enumerate destinations, gate each pair, resolve per-destination
//! reply anchors, and feed the worker queue.
//!
//! The queue is bounded; when it fills, `distribute` suspends, which in
//! turn backpressures ingress. Nothing here talks to the platform except
//! the fire-and-forget paywall nudge.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use hubcast_core::{
    ChatId, ChatKind, FastStore, HubcastError, MessageId, NormalizedMessage, PlatformClient,
    SendOptions,
};
use hubcast_storage::{queries, Database};

use crate::alias::AliasService;
use crate::paywall::Paywall;
use crate::replies;

/// Fast-store flag that drops all dispatch while set.
pub const PAUSE_KEY: &str = "pause:global";

/// A unit of work for the worker pool.
#[derive(Clone)]
pub struct SendTask {
    /// Immutable normalized payload, shared across destinations.
    pub message: Arc<NormalizedMessage>,
    pub dest_chat: ChatId,
    pub dest_kind: ChatKind,
    /// Per-destination reply anchor; sends degrade to plain messages when
    /// the anchor is gone.
    pub reply_to: Option<MessageId>,
    /// Signature snapshot taken at dispatch time.
    pub signature: Option<String>,
    /// Alias tag snapshot taken at dispatch time.
    pub alias_tag: Option<String>,
    pub attempt: u32,
}

/// How the per-destination reply anchor is derived.
enum AnchorOrigin {
    /// Resolve the message's own reply context through the send log.
    FromReply,
    /// Anchor each destination to its copy of this exact source message
    /// (edit propagation).
    OwnCopy,
}

/// Fan-out engine feeding the bounded worker queue.
pub struct Distributor {
    db: Database,
    store: Arc<dyn FastStore>,
    platform: Arc<dyn PlatformClient>,
    paywall: Paywall,
    aliases: AliasService,
    tx: mpsc::Sender<SendTask>,
}

impl Distributor {
    pub fn new(
        db: Database,
        store: Arc<dyn FastStore>,
        platform: Arc<dyn PlatformClient>,
        paywall: Paywall,
        aliases: AliasService,
        tx: mpsc::Sender<SendTask>,
    ) -> Self {
        Self {
            db,
            store,
            platform,
            paywall,
            aliases,
            tx,
        }
    }

    /// Fan a new message out to all eligible destinations.
    pub async fn distribute(&self, msg: NormalizedMessage) -> Result<(), HubcastError> {
        self.fan_out(msg, AnchorOrigin::FromReply).await
    }

    /// Fan an edited message out, threading each destination to its copy
    /// of the original.
    pub async fn distribute_edit(&self, msg: NormalizedMessage) -> Result<(), HubcastError> {
        self.fan_out(msg, AnchorOrigin::OwnCopy).await
    }

    async fn fan_out(
        &self,
        msg: NormalizedMessage,
        anchor_origin: AnchorOrigin,
    ) -> Result<(), HubcastError> {
        if self.paused().await {
            info!(
                source_chat = msg.source_chat.0,
                source_message = msg.source_message.0,
                "dispatch paused, dropping message"
            );
            return Ok(());
        }

        let source = queries::chats::get(&self.db, msg.source_chat).await?;
        if source.as_ref().is_some_and(|c| c.out_paused) {
            debug!(source_chat = msg.source_chat.0, "source is out-paused");
            return Ok(());
        }

        let destinations = queries::chats::active_destinations(&self.db).await?;
        if destinations.is_empty() {
            return Ok(());
        }

        // Snapshots shared by every destination of this wave.
        let alias_tag = match msg.source_user {
            Some(user) => match self.aliases.tag_for(user).await {
                Ok(tag) => Some(tag),
                Err(e) => {
                    debug!(user_id = user.0, error = %e, "alias resolution failed");
                    None
                }
            },
            None => None,
        };
        let signature = crate::signature::load(&self.db).await?;

        let origin = match anchor_origin {
            AnchorOrigin::OwnCopy => Some((msg.source_chat, msg.source_message)),
            AnchorOrigin::FromReply => match msg.reply_to {
                Some(ctx) => replies::resolve_origin(&self.db, ctx).await?,
                None => None,
            },
        };

        let registered_at = source.as_ref().map(|c| c.registered_at.clone());
        let entitled = match &registered_at {
            Some(registered_at) => {
                self.paywall.is_entitled(msg.source_chat, registered_at).await?
            }
            // Unregistered sources are filtered at ingress; an edit racing
            // a deregistration lands here and is treated as entitled for
            // its own chat only.
            None => true,
        };

        let message = Arc::new(msg);
        let mut suppressed = false;
        for dest in destinations {
            let self_send = dest.id == message.source_chat;
            if self_send && !dest.allow_self_send {
                continue;
            }
            if dest.in_paused {
                continue;
            }
            if !self_send && !entitled {
                suppressed = true;
                continue;
            }

            let reply_to = match origin {
                Some(origin) => replies::anchor_for(&self.db, origin, dest.id).await?,
                None => None,
            };

            let task = SendTask {
                message: Arc::clone(&message),
                dest_chat: dest.id,
                dest_kind: dest.kind,
                reply_to,
                signature: signature.clone(),
                alias_tag: alias_tag.clone(),
                attempt: 0,
            };
            self.tx
                .send(task)
                .await
                .map_err(|_| HubcastError::QueueClosed)?;
        }

        if suppressed {
            self.nudge_source(message.source_chat).await;
        }
        Ok(())
    }

    async fn paused(&self) -> bool {
        matches!(self.store.get(PAUSE_KEY).await, Ok(Some(v)) if v == "1")
    }

    /// Count the suppressed wave and, at most once per day, tell the
    /// source what it is missing. Fire-and-forget: a failed nudge never
    /// affects dispatch.
    async fn nudge_source(&self, chat: ChatId) {
        let missed = self.paywall.record_missed(chat).await;
        if !self.paywall.should_nudge(chat).await {
            return;
        }
        let platform = Arc::clone(&self.platform);
        tokio::spawn(async move {
            let plural = if missed == 1 { "message" } else { "messages" };
            let text = format!(
                "You missed {missed} {plural} today — subscribe to keep sending \
                 to your whole network."
            );
            if let Err(e) = platform
                .send_text(chat, &text, &SendOptions::default())
                .await
            {
                warn!(chat_id = chat.0, error = %e, "paywall nudge failed");
            }
        });
    }
}
