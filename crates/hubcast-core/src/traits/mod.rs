// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the engine and its external collaborators.
//!
//! All traits use `#[async_trait]` for dynamic dispatch compatibility.

pub mod faststore;
pub mod platform;

pub use faststore::FastStore;
pub use platform::{AlbumItem, PlatformClient, SendOptions};
