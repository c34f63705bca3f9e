// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./hubcast.toml` > `~/.config/hubcast/hubcast.toml`
//! > `/etc/hubcast/hubcast.toml` with environment variable overrides via
//! `HUBCAST_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::HubcastConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/hubcast/hubcast.toml` (system-wide)
/// 3. `~/.config/hubcast/hubcast.toml` (user XDG config)
/// 4. `./hubcast.toml` (local directory)
/// 5. `HUBCAST_*` environment variables
pub fn load_config() -> Result<HubcastConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HubcastConfig::default()))
        .merge(Toml::file("/etc/hubcast/hubcast.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("hubcast/hubcast.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("hubcast.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<HubcastConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HubcastConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<HubcastConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(HubcastConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `HUBCAST_TELEGRAM_BOT_TOKEN` must map
/// to `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("HUBCAST_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("telegram_", "telegram.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("faststore_", "faststore.", 1)
            .replacen("engine_", "engine.", 1)
            .replacen("logging_", "logging.", 1);
        mapped.into()
    })
}
