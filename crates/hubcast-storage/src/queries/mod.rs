// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the durable store entities.

pub mod aliases;
pub mod chats;
pub mod config;
pub mod restrictions;
pub mod send_log;
pub mod subscriptions;
