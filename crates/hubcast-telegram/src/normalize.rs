// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction of a [`NormalizedMessage`] from an incoming Telegram message.
//!
//! The content kind is decided by the first payload field found in
//! priority order: text, photo (largest variant), video, animation,
//! audio, document, voice, video note, sticker. Captions are lifted
//! uniformly. Unsupported updates (polls, service notices, paid media)
//! normalize to `None` and are skipped.

use teloxide::types::{FileMeta, Message};
use tracing::debug;

use hubcast_core::{
    ChatId, MediaHandle, MediaKind, MessageId, MessagePayload, NormalizedMessage, UserId,
};

/// Extract a normalized record, or `None` for unsupported message kinds.
pub fn normalize(msg: &Message) -> Option<NormalizedMessage> {
    let caption = msg.caption().map(str::to_string);

    let payload = if let Some(text) = msg.text() {
        MessagePayload::Text {
            body: text.to_string(),
        }
    } else if let Some(photos) = msg.photo() {
        // Telegram sends several resolutions of the same photo; re-send
        // the largest one.
        let largest = photos.iter().max_by_key(|p| p.file.size)?;
        media(MediaKind::Photo, &largest.file, caption)
    } else if let Some(video) = msg.video() {
        media(MediaKind::Video, &video.file, caption)
    } else if let Some(animation) = msg.animation() {
        media(MediaKind::Animation, &animation.file, caption)
    } else if let Some(audio) = msg.audio() {
        media(MediaKind::Audio, &audio.file, caption)
    } else if let Some(document) = msg.document() {
        media(MediaKind::Document, &document.file, caption)
    } else if let Some(voice) = msg.voice() {
        media(MediaKind::Voice, &voice.file, caption)
    } else if let Some(video_note) = msg.video_note() {
        media(MediaKind::VideoNote, &video_note.file, None)
    } else if let Some(sticker) = msg.sticker() {
        media(MediaKind::Sticker, &sticker.file, None)
    } else {
        debug!(
            chat_id = msg.chat.id.0,
            msg_id = msg.id.0,
            "skipping unsupported message kind"
        );
        return None;
    };

    let mut normalized = NormalizedMessage::new(
        ChatId(msg.chat.id.0),
        MessageId(msg.id.0 as i64),
        msg.from.as_ref().map(|u| UserId(u.id.0 as i64)),
        payload,
    );
    normalized.album_id = msg.media_group_id().map(str::to_string);
    Some(normalized)
}

fn media(kind: MediaKind, file: &FileMeta, caption: Option<String>) -> MessagePayload {
    MessagePayload::Media {
        kind,
        media: MediaHandle {
            file_id: file.id.clone(),
            file_unique_id: file.unique_id.clone(),
        },
        caption,
    }
}
