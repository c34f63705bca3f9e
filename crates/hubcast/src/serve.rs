// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring: configuration, stores, platform client, engine, and ingress.

use std::sync::Arc;
use std::time::Duration;

use teloxide::Bot;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hubcast_config::HubcastConfig;
use hubcast_core::{FastStore, HubcastError, MemoryStore};
use hubcast_engine::{Engine, EngineSettings};
use hubcast_redis::RedisStore;
use hubcast_storage::Database;
use hubcast_telegram::{dispatch, TelegramPlatform};

use crate::signals::install_signal_handler;

/// Start everything and run until SIGINT/SIGTERM.
pub async fn run() -> Result<(), HubcastError> {
    let config = load()?;
    init_tracing(&config);

    let token = config
        .telegram
        .bot_token
        .clone()
        .ok_or_else(|| HubcastError::Config("telegram.bot_token is required".into()))?;

    let db = Database::open(&config.storage.database_path).await?;
    let store: Arc<dyn FastStore> = match &config.faststore.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            info!("no redis configured, using the in-process fast store");
            Arc::new(MemoryStore::new())
        }
    };

    let bot = Bot::new(token);
    let platform = Arc::new(TelegramPlatform::new(bot.clone()));

    let engine = Engine::start(
        db.clone(),
        store,
        platform,
        EngineSettings {
            worker_count: config.engine.worker_count,
            global_rate_limit: config.engine.global_rate_limit,
            queue_capacity: config.engine.queue_capacity,
            trial_days: config.engine.trial_days,
            shutdown_grace: Duration::from_secs(config.engine.shutdown_grace_secs),
            admin_chat_ids: config.telegram.admin_chat_ids.clone(),
        },
    )
    .await?;

    // Ingress stops on signal; the engine then drains and stops.
    let shutdown = install_signal_handler();
    dispatch::run(bot, db.clone(), engine.ingress(), shutdown).await;

    engine.shutdown().await;
    db.close().await?;
    info!("bye");
    Ok(())
}

/// Print the resolved configuration (token redacted) and exit.
pub fn print_config() -> Result<(), HubcastError> {
    let mut config = load()?;
    if config.telegram.bot_token.is_some() {
        config.telegram.bot_token = Some("<redacted>".into());
    }
    let rendered = serde_json::to_string_pretty(&config)
        .map_err(|e| HubcastError::Internal(e.to_string()))?;
    println!("{rendered}");
    Ok(())
}

fn load() -> Result<HubcastConfig, HubcastError> {
    hubcast_config::load_config().map_err(|e| HubcastError::Config(e.to_string()))
}

fn init_tracing(config: &HubcastConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
