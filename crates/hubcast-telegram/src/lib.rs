// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram adapter for hubcast.
//!
//! Implements the engine's [`PlatformClient`](hubcast_core::PlatformClient)
//! over the Telegram Bot API via teloxide, and drives ingress with long
//! polling: normalization, self-message filtering, first-sight chat
//! registration, and reply-context detection.

pub mod client;
pub mod dispatch;
pub mod normalize;

pub use client::TelegramPlatform;
