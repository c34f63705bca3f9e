// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hubcast distribution engine.
//!
//! Consumes normalized messages from the adapter layer and re-emits them
//! as original messages into every other registered chat, preserving
//! album grouping and reply threads, under global and per-chat pacing,
//! deduplication, moderation, and the paywall gate.
//!
//! Pipeline: ingress → album buffer (if grouped) → dedup → distributor →
//! per-destination {paywall, reply anchor} → worker pool → send log.

pub mod album;
pub mod alias;
pub mod dedup;
pub mod distributor;
pub mod engine;
pub mod ingress;
pub mod moderation;
pub mod paywall;
pub mod ratelimit;
pub mod reminders;
pub mod replies;
pub mod sender;
pub mod signature;
pub mod sweeper;
pub mod worker;

pub use distributor::{Distributor, SendTask};
pub use engine::{Engine, EngineSettings};
pub use ingress::Ingress;
pub use ratelimit::RateLimiter;
