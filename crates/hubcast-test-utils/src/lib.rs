// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for hubcast: a scriptable mock platform client and
//! normalized-message fixtures.

pub mod fixtures;
pub mod mock_platform;

pub use mock_platform::{MockPlatform, SentKind, SentMessage};
