// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for normalized messages used across engine tests.

use hubcast_core::{
    ChatId, MediaHandle, MediaKind, MessageId, MessagePayload, NormalizedMessage, UserId,
};

/// A plain text message from `user` in `chat`.
pub fn text_message(chat: i64, message: i64, user: i64, body: &str) -> NormalizedMessage {
    NormalizedMessage::new(
        ChatId(chat),
        MessageId(message),
        Some(UserId(user)),
        MessagePayload::Text {
            body: body.to_string(),
        },
    )
}

/// A photo message whose identity is `unique_id`.
pub fn photo_message(
    chat: i64,
    message: i64,
    user: i64,
    unique_id: &str,
    caption: Option<&str>,
) -> NormalizedMessage {
    NormalizedMessage::new(
        ChatId(chat),
        MessageId(message),
        Some(UserId(user)),
        MessagePayload::Media {
            kind: MediaKind::Photo,
            media: MediaHandle {
                file_id: format!("file-{unique_id}"),
                file_unique_id: unique_id.to_string(),
            },
            caption: caption.map(str::to_string),
        },
    )
}

/// One part of an album identified by `album_id`.
pub fn album_part(
    chat: i64,
    message: i64,
    user: i64,
    album_id: &str,
    unique_id: &str,
) -> NormalizedMessage {
    let mut part = photo_message(chat, message, user, unique_id, None);
    part.album_id = Some(album_id.to_string());
    part
}
