// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock platform client for deterministic engine tests.
//!
//! `MockPlatform` implements [`PlatformClient`] with captured sends and
//! scriptable per-chat failures, so worker error handling can be driven
//! without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use hubcast_core::{
    AlbumItem, ChatId, MediaKind, MessageId, PlatformClient, PlatformError, SendOptions,
};

/// The payload kind of a captured send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentKind {
    Text,
    Media(MediaKind),
    /// Grouped album send with this many items.
    Album(usize),
}

/// One captured outbound send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat: ChatId,
    pub kind: SentKind,
    /// Text body or first caption.
    pub body: Option<String>,
    pub reply_to: Option<MessageId>,
    /// Ids assigned to the send; albums get one per item.
    pub message_ids: Vec<MessageId>,
}

/// A scriptable, capturing platform client.
pub struct MockPlatform {
    sent: Mutex<Vec<SentMessage>>,
    failures: Mutex<HashMap<i64, VecDeque<PlatformError>>>,
    next_id: AtomicI64,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1000),
        }
    }

    /// Script the next send to `chat` to fail with `error`. Queued errors
    /// are consumed in order; once drained, sends succeed again.
    pub async fn fail_next(&self, chat: ChatId, error: PlatformError) {
        self.failures
            .lock()
            .await
            .entry(chat.0)
            .or_default()
            .push_back(error);
    }

    /// All captured sends, in order.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Captured sends to one chat, in order.
    pub async fn sent_to(&self, chat: ChatId) -> Vec<SentMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.chat == chat)
            .cloned()
            .collect()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    async fn take_failure(&self, chat: ChatId) -> Option<PlatformError> {
        let mut failures = self.failures.lock().await;
        let queue = failures.get_mut(&chat.0)?;
        let error = queue.pop_front();
        if queue.is_empty() {
            failures.remove(&chat.0);
        }
        error
    }

    async fn capture(
        &self,
        chat: ChatId,
        kind: SentKind,
        body: Option<String>,
        reply_to: Option<MessageId>,
        id_count: usize,
    ) -> Vec<MessageId> {
        let ids: Vec<MessageId> = (0..id_count)
            .map(|_| MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
            .collect();
        self.sent.lock().await.push(SentMessage {
            chat,
            kind,
            body,
            reply_to,
            message_ids: ids.clone(),
        });
        ids
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        if let Some(error) = self.take_failure(chat).await {
            return Err(error);
        }
        let ids = self
            .capture(chat, SentKind::Text, Some(text.to_string()), opts.reply_to, 1)
            .await;
        Ok(ids[0])
    }

    async fn send_media(
        &self,
        chat: ChatId,
        kind: MediaKind,
        _media: &hubcast_core::MediaHandle,
        caption: Option<&str>,
        opts: &SendOptions,
    ) -> Result<MessageId, PlatformError> {
        if let Some(error) = self.take_failure(chat).await {
            return Err(error);
        }
        let ids = self
            .capture(
                chat,
                SentKind::Media(kind),
                caption.map(str::to_string),
                opts.reply_to,
                1,
            )
            .await;
        Ok(ids[0])
    }

    async fn send_media_group(
        &self,
        chat: ChatId,
        items: &[AlbumItem],
        opts: &SendOptions,
    ) -> Result<Vec<MessageId>, PlatformError> {
        if let Some(error) = self.take_failure(chat).await {
            return Err(error);
        }
        let body = items.first().and_then(|i| i.caption.clone());
        Ok(self
            .capture(
                chat,
                SentKind::Album(items.len()),
                body,
                opts.reply_to,
                items.len(),
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn captures_sends_with_fresh_ids() {
        let platform = MockPlatform::new();
        let a = platform
            .send_text(ChatId(200), "hi", &SendOptions::default())
            .await
            .unwrap();
        let b = platform
            .send_text(ChatId(300), "hi", &SendOptions::default())
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(platform.sent_count().await, 2);
        assert_eq!(platform.sent_to(ChatId(200)).await.len(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_are_consumed_in_order() {
        let platform = MockPlatform::new();
        platform
            .fail_next(
                ChatId(300),
                PlatformError::TooManyRequests {
                    retry_after: Duration::from_secs(2),
                },
            )
            .await;

        let first = platform
            .send_text(ChatId(300), "x", &SendOptions::default())
            .await;
        assert!(matches!(
            first,
            Err(PlatformError::TooManyRequests { .. })
        ));

        // Queue drained; next send succeeds.
        platform
            .send_text(ChatId(300), "x", &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(platform.sent_count().await, 1);
    }

    #[tokio::test]
    async fn album_sends_return_one_id_per_item() {
        let platform = MockPlatform::new();
        let items = vec![
            AlbumItem {
                kind: MediaKind::Photo,
                media: hubcast_core::MediaHandle {
                    file_id: "f1".into(),
                    file_unique_id: "u1".into(),
                },
                caption: Some("cap".into()),
            },
            AlbumItem {
                kind: MediaKind::Photo,
                media: hubcast_core::MediaHandle {
                    file_id: "f2".into(),
                    file_unique_id: "u2".into(),
                },
                caption: None,
            },
        ];
        let ids = platform
            .send_media_group(ChatId(200), &items, &SendOptions::default())
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let sent = platform.sent().await;
        assert_eq!(sent[0].kind, SentKind::Album(2));
        assert_eq!(sent[0].body.as_deref(), Some("cap"));
    }
}
