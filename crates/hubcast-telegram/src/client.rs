// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Teloxide-backed [`PlatformClient`].
//!
//! Everything is re-sent by file id; forwardMessage/copyMessage are never
//! used, so delivered messages carry no forwarding metadata. Teloxide
//! errors are mapped to the structured [`PlatformError`] taxonomy the
//! workers branch on.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    InputFile, InputMedia, InputMediaAnimation, InputMediaAudio, InputMediaDocument,
    InputMediaPhoto, InputMediaVideo, ReplyParameters,
};
use teloxide::{ApiError, RequestError};

use hubcast_core::{
    AlbumItem, ChatId, MediaHandle, MediaKind, MessageId, PlatformClient, PlatformError,
    SendOptions,
};

/// Telegram implementation of the platform send surface.
#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn chat(id: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(id.0)
}

fn message_id(sent: &teloxide::types::Message) -> MessageId {
    MessageId(sent.id.0 as i64)
}

fn reply_params(opts: &SendOptions) -> Option<ReplyParameters> {
    let anchor = opts.reply_to?;
    let mut params = ReplyParameters::new(teloxide::types::MessageId(anchor.0 as i32));
    if opts.allow_missing_reply {
        params.allow_sending_without_reply = Some(true);
    }
    Some(params)
}

/// Map a teloxide error into the recovery taxonomy.
fn map_send_err(e: RequestError) -> PlatformError {
    match e {
        RequestError::RetryAfter(secs) => PlatformError::TooManyRequests {
            retry_after: secs.duration(),
        },
        RequestError::MigrateToChatId(new) => PlatformError::Migrated {
            new_chat_id: ChatId(new.0),
        },
        RequestError::Api(api) => match api {
            ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::UserDeactivated
            | ApiError::GroupDeactivated => PlatformError::Forbidden,
            ApiError::ChatNotFound => PlatformError::ChatNotFound,
            other => PlatformError::BadRequest(other.to_string()),
        },
        RequestError::Network(e) => PlatformError::Network(e.to_string()),
        other => PlatformError::Network(other.to_string()),
    }
}

#[async_trait]
impl PlatformClient for TelegramPlatform {
    async fn send_text(
        &self,
        dest: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        let mut req = self.bot.send_message(chat(dest), text);
        if let Some(params) = reply_params(opts) {
            req = req.reply_parameters(params);
        }
        let sent = req.await.map_err(map_send_err)?;
        Ok(message_id(&sent))
    }

    async fn send_media(
        &self,
        dest: ChatId,
        kind: MediaKind,
        media: &MediaHandle,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        let file = InputFile::file_id(media.file_id.clone());
        let params = reply_params(opts);
        let caption = caption.map(str::to_string);

        let sent = match kind {
            MediaKind::Photo => {
                let mut req = self.bot.send_photo(chat(dest), file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(chat(dest), file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
            MediaKind::Animation => {
                let mut req = self.bot.send_animation(chat(dest), file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
            MediaKind::Audio => {
                let mut req = self.bot.send_audio(chat(dest), file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
            MediaKind::Document => {
                let mut req = self.bot.send_document(chat(dest), file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
            MediaKind::Voice => {
                let mut req = self.bot.send_voice(chat(dest), file);
                if let Some(c) = caption {
                    req = req.caption(c);
                }
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
            MediaKind::VideoNote => {
                let mut req = self.bot.send_video_note(chat(dest), file);
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
            MediaKind::Sticker => {
                let mut req = self.bot.send_sticker(chat(dest), file);
                if let Some(p) = params {
                    req = req.reply_parameters(p);
                }
                req.await
            }
        };
        Ok(message_id(&sent.map_err(map_send_err)?))
    }

    async fn send_media_group(
        &self,
        dest: ChatId,
        items: &[AlbumItem],
        opts: &SendOptions,
    ) -> Result<Vec<MessageId>, PlatformError> {
        let mut media = Vec::with_capacity(items.len());
        for item in items {
            media.push(input_media(item)?);
        }

        let mut req = self.bot.send_media_group(chat(dest), media);
        if let Some(params) = reply_params(opts) {
            req = req.reply_parameters(params);
        }
        let sent = req.await.map_err(map_send_err)?;
        Ok(sent.iter().map(message_id).collect())
    }
}

fn input_media(item: &AlbumItem) -> Result<InputMedia, PlatformError> {
    let file = InputFile::file_id(item.media.file_id.clone());
    let caption = item.caption.clone();
    Ok(match item.kind {
        MediaKind::Photo => {
            let mut m = InputMediaPhoto::new(file);
            m.caption = caption;
            InputMedia::Photo(m)
        }
        MediaKind::Video => {
            let mut m = InputMediaVideo::new(file);
            m.caption = caption;
            InputMedia::Video(m)
        }
        MediaKind::Animation => {
            let mut m = InputMediaAnimation::new(file);
            m.caption = caption;
            InputMedia::Animation(m)
        }
        MediaKind::Audio => {
            let mut m = InputMediaAudio::new(file);
            m.caption = caption;
            InputMedia::Audio(m)
        }
        MediaKind::Document => {
            let mut m = InputMediaDocument::new(file);
            m.caption = caption;
            InputMedia::Document(m)
        }
        // The sender never groups these kinds; reaching here is a
        // payload bug, surfaced as a dropped task.
        MediaKind::Voice | MediaKind::VideoNote | MediaKind::Sticker => {
            return Err(PlatformError::BadRequest(format!(
                "{} cannot be sent in a media group",
                item.kind
            )))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn reply_params_carry_allow_missing() {
        let opts = SendOptions::replying_to(Some(MessageId(700)));
        let params = reply_params(&opts).unwrap();
        assert_eq!(params.message_id.0, 700);
        assert_eq!(params.allow_sending_without_reply, Some(true));

        assert!(reply_params(&SendOptions::default()).is_none());
    }

    #[test]
    fn error_mapping_covers_the_taxonomy() {
        assert!(matches!(
            map_send_err(RequestError::Api(ApiError::BotBlocked)),
            PlatformError::Forbidden
        ));
        assert!(matches!(
            map_send_err(RequestError::Api(ApiError::ChatNotFound)),
            PlatformError::ChatNotFound
        ));
        assert!(matches!(
            map_send_err(RequestError::MigrateToChatId(teloxide::types::ChatId(-1001))),
            PlatformError::Migrated {
                new_chat_id: ChatId(-1001)
            }
        ));
        let retry = map_send_err(RequestError::RetryAfter(
            teloxide::types::Seconds::from_seconds(2),
        ));
        match retry {
            PlatformError::TooManyRequests { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(2));
            }
            other => panic!("expected TooManyRequests, got {other:?}"),
        }
    }

    #[test]
    fn ungroupable_kinds_are_rejected() {
        let item = AlbumItem {
            kind: MediaKind::Sticker,
            media: MediaHandle {
                file_id: "f".into(),
                file_unique_id: "u".into(),
            },
            caption: None,
        };
        assert!(matches!(
            input_media(&item),
            Err(PlatformError::BadRequest(_))
        ));
    }
}
