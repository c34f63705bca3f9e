// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform client trait: the send surface the engine drives.
//!
//! Implementations re-send content as original messages using stable media
//! handles. Forward/copy primitives are never part of this interface, so
//! outbound messages can never carry forwarding metadata.

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::{ChatId, MediaHandle, MediaKind, MessageId};

/// Per-send options threaded from a `SendTask`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    /// Reply anchor in destination coordinates, when one was resolved.
    pub reply_to: Option<MessageId>,
    /// Deliver as a plain message if the anchor no longer exists
    /// (pruned from the send log or deleted in the destination).
    pub allow_missing_reply: bool,
}

impl SendOptions {
    /// An anchored send that degrades to a plain message on a missing anchor.
    pub fn replying_to(anchor: Option<MessageId>) -> Self {
        Self {
            reply_to: anchor,
            allow_missing_reply: true,
        }
    }
}

/// One member of a grouped album send.
#[derive(Debug, Clone)]
pub struct AlbumItem {
    pub kind: MediaKind,
    pub media: MediaHandle,
    /// Only the first item of a group may carry a caption.
    pub caption: Option<String>,
}

/// Abstract send operations against the messaging platform.
///
/// The sender dispatches on the payload tag and calls exactly one of
/// these per task. Errors surface as structured [`PlatformError`] kinds
/// so the worker can apply the recovery policy.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Send a plain text message. Returns the new message id.
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError>;

    /// Re-send a single media attachment by its stable handle.
    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        media: &MediaHandle,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError>;

    /// Send up to ten media as one grouped album. Returns the new message
    /// ids in item order.
    async fn send_media_group(
        &self,
        chat: ChatId,
        items: &[AlbumItem],
        opts: &SendOptions,
    ) -> Result<Vec<MessageId>, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replying_to_sets_allow_missing() {
        let opts = SendOptions::replying_to(Some(MessageId(5)));
        assert_eq!(opts.reply_to, Some(MessageId(5)));
        assert!(opts.allow_missing_reply);

        let none = SendOptions::default();
        assert!(none.reply_to.is_none());
        assert!(!none.allow_missing_reply);
    }
}
