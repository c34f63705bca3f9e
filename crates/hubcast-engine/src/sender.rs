// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps a send task onto the matching platform operation.
//!
//! Always re-sends by stable media handle, never by forward/copy, so
//! delivered messages carry no forwarding metadata. Returns the
//! (source message, destination message) pairs to record in the send log.

use tracing::warn;

use hubcast_core::{
    AlbumItem, MediaKind, MessageId, MessagePayload, NormalizedMessage, PlatformClient,
    PlatformError, SendOptions,
};

use crate::distributor::SendTask;
use crate::signature::{compose_body, CAPTION_MAX_LEN, TEXT_MAX_LEN};

/// Platform cap on media per grouped send.
const ALBUM_CHUNK: usize = 10;

/// Execute one task against the platform. On success, returns one
/// (source message id, destination message id) pair per delivered message.
pub async fn deliver(
    platform: &dyn PlatformClient,
    task: &SendTask,
) -> Result<Vec<(MessageId, MessageId)>, PlatformError> {
    let msg = task.message.as_ref();
    let opts = match task.reply_to {
        Some(anchor) => SendOptions::replying_to(Some(anchor)),
        None => SendOptions::default(),
    };
    let alias = task.alias_tag.as_deref();
    let signature = task.signature.as_deref();

    match &msg.payload {
        MessagePayload::Text { body } => {
            let text = compose_body(Some(body), alias, signature, TEXT_MAX_LEN)
                .unwrap_or_default();
            let id = platform.send_text(task.dest_chat, &text, &opts).await?;
            Ok(vec![(msg.source_message, id)])
        }
        MessagePayload::Media {
            kind,
            media,
            caption,
        } => {
            // Stickers and video notes take no caption on the platform, so
            // alias and signature are not applicable to them.
            let caption = if captionable(*kind) {
                compose_body(caption.as_deref(), alias, signature, CAPTION_MAX_LEN)
            } else {
                None
            };
            let id = platform
                .send_media(task.dest_chat, *kind, media, caption.as_deref(), &opts)
                .await?;
            Ok(vec![(msg.source_message, id)])
        }
        MessagePayload::Album { parts } => {
            deliver_album(platform, task, parts, opts).await
        }
    }
}

fn captionable(kind: MediaKind) -> bool {
    !matches!(kind, MediaKind::Sticker | MediaKind::VideoNote)
}

async fn deliver_album(
    platform: &dyn PlatformClient,
    task: &SendTask,
    parts: &[NormalizedMessage],
    opts: SendOptions,
) -> Result<Vec<(MessageId, MessageId)>, PlatformError> {
    // A degenerate one-part album is an ordinary single send.
    if let [only] = parts {
        let single = SendTask {
            message: std::sync::Arc::new(only.clone()),
            ..task.clone()
        };
        return Box::pin(deliver(platform, &single)).await;
    }

    let mut pairs = Vec::with_capacity(parts.len());
    // Only the first group of the first chunk gets the composed caption
    // and the reply anchor.
    let mut first_send = true;

    for group in group_compatible(parts) {
        if group.len() == 1 {
            let part = group[0];
            let single = SendTask {
                message: std::sync::Arc::new(part.clone()),
                reply_to: if first_send { task.reply_to } else { None },
                alias_tag: if first_send { task.alias_tag.clone() } else { None },
                signature: if first_send { task.signature.clone() } else { None },
                ..task.clone()
            };
            first_send = false;
            pairs.extend(Box::pin(deliver(platform, &single)).await?);
            continue;
        }

        for chunk in group.chunks(ALBUM_CHUNK) {
            let items: Vec<AlbumItem> = chunk
                .iter()
                .enumerate()
                .map(|(i, part)| album_item(part, i == 0 && first_send, task))
                .collect();
            let chunk_opts = if first_send {
                opts
            } else {
                SendOptions::default()
            };
            first_send = false;

            let ids = platform
                .send_media_group(task.dest_chat, &items, &chunk_opts)
                .await?;
            if ids.len() != chunk.len() {
                warn!(
                    expected = chunk.len(),
                    got = ids.len(),
                    "album send returned unexpected id count"
                );
            }
            for (part, id) in chunk.iter().zip(ids) {
                pairs.push((part.source_message, id));
            }
        }
    }
    Ok(pairs)
}

fn album_item(part: &NormalizedMessage, lead: bool, task: &SendTask) -> AlbumItem {
    let MessagePayload::Media {
        kind,
        media,
        caption,
    } = &part.payload
    else {
        // Album parts are media by construction (the buffer only holds
        // media messages); anything else would be a bug upstream.
        unreachable!("album part without media payload");
    };
    let caption = if lead {
        compose_body(
            caption.as_deref(),
            task.alias_tag.as_deref(),
            task.signature.as_deref(),
            CAPTION_MAX_LEN,
        )
    } else {
        caption.clone()
    };
    AlbumItem {
        kind: *kind,
        media: media.clone(),
        caption,
    }
}

/// Split album parts into groups the platform accepts in one grouped send:
/// photos, videos, and animations mix freely; audio only groups with
/// audio; documents only with documents; everything else goes out as
/// individual sends.
fn group_compatible(parts: &[NormalizedMessage]) -> Vec<Vec<&NormalizedMessage>> {
    let mut visual = Vec::new();
    let mut audio = Vec::new();
    let mut documents = Vec::new();
    let mut other = Vec::new();

    for part in parts {
        let MessagePayload::Media { kind, .. } = &part.payload else {
            other.push(part);
            continue;
        };
        match kind {
            MediaKind::Photo | MediaKind::Video | MediaKind::Animation => visual.push(part),
            MediaKind::Audio => audio.push(part),
            MediaKind::Document => documents.push(part),
            _ => other.push(part),
        }
    }

    let mut groups = Vec::new();
    if !visual.is_empty() {
        groups.push(visual);
    }
    if !audio.is_empty() {
        groups.push(audio);
    }
    if !documents.is_empty() {
        groups.push(documents);
    }
    for part in other {
        groups.push(vec![part]);
    }
    groups
}
