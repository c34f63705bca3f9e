// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the hubcast redistribution engine.

use std::time::Duration;

use thiserror::Error;

use crate::types::ChatId;

/// The primary error type used across hubcast crates.
#[derive(Debug, Error)]
pub enum HubcastError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store errors (database open, query failure, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Fast store errors (connection loss, protocol failure).
    #[error(transparent)]
    FastStore(#[from] FastStoreError),

    /// A platform send operation failed.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The send-task queue was closed while the distributor was still running.
    #[error("send queue closed")]
    QueueClosed,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error type for [`FastStore`](crate::traits::FastStore) operations.
///
/// Deliberately flat: callers either proceed without the cache (optional
/// keys) or surface the message; no recovery branches on the kind.
#[derive(Debug, Error)]
#[error("fast store error: {0}")]
pub struct FastStoreError(pub String);

/// Structured outcome of a failed platform send, keyed by recovery policy.
///
/// Workers branch on these variants: transient kinds are retried, fatal
/// kinds deactivate the destination or drop the task.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform rejected the send for pacing reasons; retry after the
    /// indicated delay.
    #[error("too many requests, retry after {retry_after:?}")]
    TooManyRequests { retry_after: Duration },

    /// The bot was blocked or removed from the chat. Never retried.
    #[error("forbidden")]
    Forbidden,

    /// The chat does not exist (deleted, or the bot never saw it). Never retried.
    #[error("chat not found")]
    ChatNotFound,

    /// The chat was migrated to a new id (group upgraded to supergroup).
    #[error("chat migrated to {new_chat_id:?}")]
    Migrated { new_chat_id: ChatId },

    /// The payload was rejected (malformed entity, expired media handle).
    /// Dropped without retries.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Transport-level failure; retried like a 429 without a server hint.
    #[error("network error: {0}")]
    Network(String),
}

impl PlatformError {
    /// Whether a worker may re-enqueue the task after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlatformError::TooManyRequests { .. } | PlatformError::Network(_)
        )
    }

    /// Whether this error means the destination is permanently gone.
    pub fn is_destination_fatal(&self) -> bool {
        matches!(self, PlatformError::Forbidden | PlatformError::ChatNotFound)
    }
}
