// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-poll ingress: routes Telegram updates into the engine.
//!
//! Filters the bot's own messages (loop prevention), registers chats on
//! first sight, attaches reply context when the replied-to message is
//! the bot's own, and hands normalized content to the engine's ingress.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::Me;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use hubcast_core::{ChatId, ChatKind, MessageId, ReplyContext};
use hubcast_engine::Ingress;
use hubcast_storage::{queries, Database};

use crate::normalize;

/// Map the platform's chat kind onto the registry's.
pub fn chat_kind(chat: &teloxide::types::Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_group() {
        ChatKind::Group
    } else if chat.is_supergroup() {
        ChatKind::Supergroup
    } else {
        ChatKind::Channel
    }
}

/// Run the update dispatcher until `shutdown` fires.
pub async fn run(
    bot: Bot,
    db: Database,
    ingress: Arc<Ingress>,
    shutdown: CancellationToken,
) {
    let me = match bot.get_me().await {
        Ok(me) => me,
        Err(e) => {
            error!(error = %e, "getMe failed, cannot start ingress");
            return;
        }
    };
    info!(bot = %me.username(), "starting long polling");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_channel_post().endpoint(on_message))
        .branch(Update::filter_edited_message().endpoint(on_edited))
        .branch(Update::filter_edited_channel_post().endpoint(on_edited));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![db, ingress, me])
        .default_handler(|_| async {}) // Silently ignore other update kinds.
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        if let Ok(wait) = token.shutdown() {
            wait.await;
        }
    });

    dispatcher.dispatch().await;
    info!("long polling stopped");
}

async fn on_message(
    msg: Message,
    me: Me,
    db: Database,
    ingress: Arc<Ingress>,
) -> ResponseResult<()> {
    if let Some(normalized) = prepare(&msg, &me, &db).await {
        if let Err(e) = ingress.handle_message(normalized).await {
            error!(chat_id = msg.chat.id.0, error = %e, "ingress failed");
        }
    }
    Ok(())
}

async fn on_edited(
    msg: Message,
    me: Me,
    db: Database,
    ingress: Arc<Ingress>,
) -> ResponseResult<()> {
    if let Some(normalized) = prepare(&msg, &me, &db).await {
        if let Err(e) = ingress.handle_edit(normalized).await {
            error!(chat_id = msg.chat.id.0, error = %e, "edit ingress failed");
        }
    }
    Ok(())
}

/// Common pre-processing: self filter, first-sight registration,
/// normalization, reply-context detection.
async fn prepare(
    msg: &Message,
    me: &Me,
    db: &Database,
) -> Option<hubcast_core::NormalizedMessage> {
    // Drop the bot's own messages to prevent re-distribution loops.
    if msg.from.as_ref().is_some_and(|u| u.id == me.id) {
        debug!(chat_id = msg.chat.id.0, msg_id = msg.id.0, "dropping self-message");
        return None;
    }

    register_on_first_sight(msg, db).await;

    let mut normalized = normalize::normalize(msg)?;

    // Reply context only counts when the replied-to message was sent by
    // this bot in the same chat; anything else cannot thread.
    if let Some(replied) = msg.reply_to_message() {
        if replied.from.as_ref().is_some_and(|u| u.id == me.id) {
            normalized.reply_to = Some(ReplyContext {
                chat: ChatId(msg.chat.id.0),
                message: MessageId(replied.id.0 as i64),
            });
        }
    }
    Some(normalized)
}

async fn register_on_first_sight(msg: &Message, db: &Database) {
    let id = ChatId(msg.chat.id.0);
    match queries::chats::get(db, id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            let result = queries::chats::upsert(
                db,
                id,
                chat_kind(&msg.chat),
                msg.chat.title().map(str::to_string),
                msg.chat.username().map(str::to_string),
            )
            .await;
            match result {
                Ok(chat) => info!(chat_id = id.0, kind = %chat.kind, "registered chat on first sight"),
                Err(e) => warn!(chat_id = id.0, error = %e, "chat registration failed"),
            }
        }
        Err(e) => warn!(chat_id = id.0, error = %e, "registry read failed"),
    }
}
