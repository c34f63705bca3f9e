// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine assembly and lifecycle.
//!
//! Wires the distributor, worker pool, album buffer, and background jobs
//! over the shared stores, and coordinates graceful shutdown: ingress
//! stops first (the adapter's job), the queue drains within a grace
//! period, then remaining work is cancelled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use hubcast_core::{FastStore, HubcastError, PlatformClient};
use hubcast_storage::Database;

use crate::album::AlbumBuffer;
use crate::alias::AliasService;
use crate::distributor::Distributor;
use crate::ingress::Ingress;
use crate::paywall::Paywall;
use crate::ratelimit::RateLimiter;
use crate::reminders::TrialReminder;
use crate::sweeper;
use crate::worker::{spawn_workers, WorkerContext};

/// Engine tuning, mapped from configuration by the binary.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub worker_count: usize,
    pub global_rate_limit: u64,
    pub queue_capacity: usize,
    pub trial_days: i64,
    pub shutdown_grace: Duration,
    pub admin_chat_ids: Vec<i64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            worker_count: 10,
            global_rate_limit: 25,
            queue_capacity: 1000,
            trial_days: 30,
            shutdown_grace: Duration::from_secs(30),
            admin_chat_ids: Vec::new(),
        }
    }
}

/// The running distribution engine.
pub struct Engine {
    ingress: Arc<Ingress>,
    albums: AlbumBuffer,
    workers: Vec<JoinHandle<()>>,
    background: Vec<JoinHandle<()>>,
    tx: mpsc::Sender<crate::distributor::SendTask>,
    shutdown: CancellationToken,
    grace: Duration,
}

impl Engine {
    /// Assemble and start the engine: worker pool, album buffer, retention
    /// sweeper, and trial reminders.
    pub async fn start(
        db: Database,
        store: Arc<dyn FastStore>,
        platform: Arc<dyn PlatformClient>,
        settings: EngineSettings,
    ) -> Result<Self, HubcastError> {
        let (tx, rx) = mpsc::channel(settings.queue_capacity);
        let shutdown = CancellationToken::new();

        let limiter = Arc::new(RateLimiter::new(
            Arc::clone(&store),
            settings.global_rate_limit,
        ));
        let paywall = Paywall::new(
            db.clone(),
            Arc::clone(&store),
            settings.trial_days,
            settings.admin_chat_ids.clone(),
        );
        let aliases = AliasService::new(db.clone(), Arc::clone(&store)).await?;

        let distributor = Arc::new(Distributor::new(
            db.clone(),
            Arc::clone(&store),
            Arc::clone(&platform),
            paywall,
            aliases,
            tx.clone(),
        ));
        let albums = AlbumBuffer::new(Arc::clone(&store), Arc::clone(&distributor));
        let ingress = Arc::new(Ingress::new(
            db.clone(),
            Arc::clone(&store),
            Arc::clone(&distributor),
            albums.clone(),
        ));

        let worker_ctx = Arc::new(WorkerContext {
            db: db.clone(),
            platform: Arc::clone(&platform),
            limiter,
            tx: tx.clone(),
            shutdown: shutdown.clone(),
        });
        let workers = spawn_workers(settings.worker_count, rx, worker_ctx);

        let background = vec![
            sweeper::spawn(db.clone(), shutdown.child_token()),
            TrialReminder {
                db,
                store,
                platform,
                trial_days: settings.trial_days,
                admin_chat_ids: settings.admin_chat_ids,
            }
            .spawn(shutdown.child_token()),
        ];

        info!("distribution engine started");
        Ok(Self {
            ingress,
            albums,
            workers,
            background,
            tx,
            shutdown,
            grace: settings.shutdown_grace,
        })
    }

    /// The content entry point for the adapter layer.
    pub fn ingress(&self) -> Arc<Ingress> {
        Arc::clone(&self.ingress)
    }

    /// Drain in-flight work and stop. The caller must have stopped
    /// feeding ingress first.
    pub async fn shutdown(self) {
        info!("engine shutting down");
        self.albums.shutdown();

        // Let queued tasks drain within the grace period.
        let deadline = Instant::now() + self.grace;
        while self.tx.capacity() < self.tx.max_capacity() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if self.tx.capacity() < self.tx.max_capacity() {
            warn!("shutdown grace elapsed with tasks still queued");
        }

        // Stop workers and background jobs; in-flight sends finish first.
        self.shutdown.cancel();
        for mut handle in self.workers.into_iter().chain(self.background) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let wait = remaining.max(Duration::from_secs(1));
            if tokio::time::timeout(wait, &mut handle).await.is_err() {
                handle.abort();
            }
        }
        info!("engine stopped");
    }
}
