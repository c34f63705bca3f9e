// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply-thread resolution across chats.
//!
//! A reply to a bot-delivered message is mapped back to its origin
//! coordinates, then forward to each destination's own copy. Threading is
//! best-effort per destination: a miss at either step never blocks
//! delivery, it just drops the anchor.

use hubcast_core::{ChatId, HubcastError, MessageId, ReplyContext};
use hubcast_storage::{queries, Database};

/// Resolve the source coordinates behind a bot-delivered message the user
/// replied to. `None` when the mapping was pruned (older than retention).
pub async fn resolve_origin(
    db: &Database,
    ctx: ReplyContext,
) -> Result<Option<(ChatId, MessageId)>, HubcastError> {
    let origin = queries::send_log::reverse_lookup(db, ctx.chat, ctx.message).await?;
    Ok(origin.map(|(chat, message, _user)| (chat, message)))
}

/// The reply anchor for one destination: that destination's copy of the
/// origin message. `None` when the origin was never delivered there.
pub async fn anchor_for(
    db: &Database,
    origin: (ChatId, MessageId),
    dest: ChatId,
) -> Result<Option<MessageId>, HubcastError> {
    queries::send_log::dest_message_id(db, origin.0, origin.1, dest).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubcast_core::UserId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn origin_then_per_destination_anchor() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("replies.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        // (100, 9001) was delivered to 200 as 500 and to 300 as 700.
        queries::send_log::record(
            &db,
            ChatId(100),
            MessageId(9001),
            Some(UserId(7)),
            ChatId(200),
            MessageId(500),
        )
        .await
        .unwrap();
        queries::send_log::record(
            &db,
            ChatId(100),
            MessageId(9001),
            Some(UserId(7)),
            ChatId(300),
            MessageId(700),
        )
        .await
        .unwrap();

        // A reply in 200 to bot message 500 resolves to the origin.
        let origin = resolve_origin(
            &db,
            ReplyContext {
                chat: ChatId(200),
                message: MessageId(500),
            },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(origin, (ChatId(100), MessageId(9001)));

        // Destination 300 threads to its own copy; 400 never got one.
        assert_eq!(
            anchor_for(&db, origin, ChatId(300)).await.unwrap(),
            Some(MessageId(700))
        );
        assert!(anchor_for(&db, origin, ChatId(400)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pruned_origin_resolves_to_none() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("replies_miss.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let origin = resolve_origin(
            &db,
            ReplyContext {
                chat: ChatId(200),
                message: MessageId(12345),
            },
        )
        .await
        .unwrap();
        assert!(origin.is_none());
    }
}
