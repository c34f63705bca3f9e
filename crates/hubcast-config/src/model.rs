// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for hubcast.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level hubcast configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HubcastConfig {
    /// Telegram bot settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Durable store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Fast store settings.
    #[serde(default)]
    pub faststore: FastStoreConfig,

    /// Distribution engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. Required to run the bot.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat ids that bypass the paywall and may run moderation commands.
    #[serde(default)]
    pub admin_chat_ids: Vec<i64>,
}

/// Durable store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "hubcast.db".to_string()
}

/// Fast store configuration.
///
/// With `redis_url` unset the engine runs on the in-process store; set it
/// when more than one engine process shares the pacing state.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FastStoreConfig {
    /// Redis connection URL, e.g. `redis://localhost:6379/0`.
    #[serde(default)]
    pub redis_url: Option<String>,
}

/// Distribution engine tuning knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of send workers.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Global send budget per rolling second.
    #[serde(default = "default_global_rate_limit")]
    pub global_rate_limit: u64,

    /// Bound of the send-task queue; a full queue backpressures ingress.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Free trial length measured from chat registration, in days.
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    /// How long shutdown waits for in-flight sends to drain, in seconds.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            global_rate_limit: default_global_rate_limit(),
            queue_capacity: default_queue_capacity(),
            trial_days: default_trial_days(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_worker_count() -> usize {
    10
}

fn default_global_rate_limit() -> u64 {
    25
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_trial_days() -> i64 {
    30
}

fn default_shutdown_grace_secs() -> u64 {
    30
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_contract() {
        let config = HubcastConfig::default();
        assert_eq!(config.engine.worker_count, 10);
        assert_eq!(config.engine.global_rate_limit, 25);
        assert_eq!(config.engine.queue_capacity, 1000);
        assert_eq!(config.engine.trial_days, 30);
        assert_eq!(config.engine.shutdown_grace_secs, 30);
        assert!(config.telegram.bot_token.is_none());
        assert!(config.faststore.redis_url.is_none());
    }
}
