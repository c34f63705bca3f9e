// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for hubcast.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a
//! single-writer concurrency model via `tokio-rusqlite`, and typed query
//! modules for the chat registry, the send log, subscriptions, aliases,
//! restrictions, and runtime configuration cells.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::{iso, now_iso, parse_iso, Database};
