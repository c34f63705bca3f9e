// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the hubcast redistribution engine.
//!
//! This crate provides the domain types, the error taxonomy, and the trait
//! seams (`PlatformClient`, `FastStore`) that connect the engine to its
//! external collaborators. The engine itself lives in `hubcast-engine`.

pub mod error;
pub mod memstore;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{FastStoreError, HubcastError, PlatformError};
pub use memstore::MemoryStore;
pub use traits::{AlbumItem, FastStore, PlatformClient, SendOptions};
pub use types::{
    Chat, ChatId, ChatKind, EditMode, MediaHandle, MediaKind, MessageId, MessagePayload,
    NormalizedMessage, ReplyContext, Restriction, RestrictionKind, SendLogEntry, Subscription,
    UserId,
};
