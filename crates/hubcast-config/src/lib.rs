// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for hubcast.
//!
//! Layered TOML loading with `HUBCAST_*` environment overrides.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    EngineConfig, FastStoreConfig, HubcastConfig, LoggingConfig, StorageConfig, TelegramConfig,
};
