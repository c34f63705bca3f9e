// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the hubcast workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform chat identifier. Negative for groups and channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

/// Message identifier, unique within a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i64);

/// Platform user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// The kind of chat, as reported by the platform.
///
/// Drives the per-chat send cooldown: groups get wider spacing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// Behavior when a source message is edited.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, Default,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// Edits are ignored.
    #[default]
    Off,
    /// The edited content is redistributed as a fresh message.
    Resend,
}

/// Media content kinds the engine can re-send.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Audio,
    Document,
    Voice,
    VideoNote,
    Sticker,
}

/// A platform-stable handle for re-sending previously uploaded media
/// without uploading bytes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandle {
    /// Opaque id accepted by the platform's send operations.
    pub file_id: String,
    /// Stable identity of the underlying file, used for deduplication.
    pub file_unique_id: String,
}

/// The content of a normalized message. Exactly one variant per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MessagePayload {
    /// Plain text body.
    Text { body: String },
    /// A single media attachment with an optional caption. Stickers and
    /// video notes never carry a caption.
    Media {
        kind: MediaKind,
        media: MediaHandle,
        caption: Option<String>,
    },
    /// An assembled album: the buffered parts in arrival order, each a
    /// non-album `Media` message.
    Album { parts: Vec<NormalizedMessage> },
}

impl MessagePayload {
    /// The caption or text body, whichever applies.
    pub fn body(&self) -> Option<&str> {
        match self {
            MessagePayload::Text { body } => Some(body),
            MessagePayload::Media { caption, .. } => caption.as_deref(),
            MessagePayload::Album { parts } => {
                parts.first().and_then(|p| p.payload.body())
            }
        }
    }
}

/// The bot-sent message a user replied to, in source-chat coordinates.
///
/// Set by the adapter only when the replied-to message was sent by this
/// bot in the same chat; anything else is not resolvable through the
/// send log and is left unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyContext {
    pub chat: ChatId,
    pub message: MessageId,
}

/// Canonical record extracted from a raw platform update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedMessage {
    pub source_chat: ChatId,
    pub source_message: MessageId,
    /// Absent for anonymous channel posts.
    pub source_user: Option<UserId>,
    /// Album grouping id; parts sharing it are buffered and flushed together.
    pub album_id: Option<String>,
    pub payload: MessagePayload,
    pub reply_to: Option<ReplyContext>,
    pub received_at: DateTime<Utc>,
}

impl NormalizedMessage {
    pub fn new(
        source_chat: ChatId,
        source_message: MessageId,
        source_user: Option<UserId>,
        payload: MessagePayload,
    ) -> Self {
        Self {
            source_chat,
            source_message,
            source_user,
            album_id: None,
            payload,
            reply_to: None,
            received_at: Utc::now(),
        }
    }
}

/// Registry entry for a chat the bot belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub username: Option<String>,
    /// Cleared on permanent send failure (soft delete).
    pub active: bool,
    pub is_source: bool,
    pub is_destination: bool,
    /// Whether this chat receives copies of its own messages.
    pub allow_self_send: bool,
    /// Incoming deliveries to this chat are suppressed.
    pub in_paused: bool,
    /// Outgoing fan-out from this chat is suppressed.
    pub out_paused: bool,
    /// ISO 8601; trial entitlement is measured from this instant.
    pub registered_at: String,
}

/// One row of the source↔destination message mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendLogEntry {
    pub source_chat: ChatId,
    pub source_message: MessageId,
    pub source_user: Option<UserId>,
    pub dest_chat: ChatId,
    pub dest_message: MessageId,
    /// ISO 8601; rows older than the retention window are pruned.
    pub sent_at: String,
}

/// A paid subscription row for a chat.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub chat: ChatId,
    pub user: UserId,
    pub plan: String,
    pub stars_amount: i64,
    /// ISO 8601 expiry; the chat is entitled while this is in the future.
    pub expires_at: String,
}

/// Moderation restriction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RestrictionKind {
    Mute,
    Ban,
}

/// An active mute or ban against a user.
#[derive(Debug, Clone)]
pub struct Restriction {
    pub user: UserId,
    pub kind: RestrictionKind,
    pub issued_by: UserId,
    /// ISO 8601; `None` means permanent.
    pub expires_at: Option<String>,
}
