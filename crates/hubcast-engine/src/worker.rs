// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker pool: executes send tasks, applies the error recovery
//! policy, and records outcomes.
//!
//! Workers never propagate errors upward; every outcome is logged
//! structured. Sends to a single destination are serialized by the
//! per-chat cooldown; across destinations workers run in parallel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use hubcast_core::{PlatformClient, PlatformError};
use hubcast_storage::{queries, Database};

use crate::distributor::SendTask;
use crate::ratelimit::RateLimiter;
use crate::sender;

/// Retries before a transiently-failing task is dropped.
const MAX_ATTEMPTS: u32 = 3;
/// Delay before re-enqueueing after a transport-level failure.
const NETWORK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Shared context for all workers in the pool.
pub struct WorkerContext {
    pub db: Database,
    pub platform: Arc<dyn PlatformClient>,
    pub limiter: Arc<RateLimiter>,
    /// Re-enqueue channel back into the same pool.
    pub tx: mpsc::Sender<SendTask>,
    pub shutdown: CancellationToken,
}

/// Start `count` workers over the shared receiver. Handles exit when the
/// shutdown token fires (after finishing their in-flight task).
pub fn spawn_workers(
    count: usize,
    rx: mpsc::Receiver<SendTask>,
    ctx: Arc<WorkerContext>,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    let handles = (0..count)
        .map(|id| {
            let rx = Arc::clone(&rx);
            let ctx = Arc::clone(&ctx);
            tokio::spawn(worker_loop(id, rx, ctx))
        })
        .collect();
    info!(count, "distribution workers started");
    handles
}

async fn worker_loop(id: usize, rx: Arc<Mutex<mpsc::Receiver<SendTask>>>, ctx: Arc<WorkerContext>) {
    debug!(worker = id, "worker started");
    loop {
        let task = {
            let mut rx = rx.lock().await;
            tokio::select! {
                _ = ctx.shutdown.cancelled() => None,
                task = rx.recv() => task,
            }
        };
        let Some(task) = task else {
            break;
        };
        process_task(&ctx, task).await;
    }
    debug!(worker = id, "worker stopped");
}

/// Execute one task end to end, applying the recovery taxonomy.
async fn process_task(ctx: &WorkerContext, task: SendTask) {
    let dest = task.dest_chat;

    // Deactivated destinations drop their queued backlog.
    match queries::chats::get(&ctx.db, dest).await {
        Ok(Some(chat)) if !chat.active => {
            debug!(chat_id = dest.0, "destination inactive, dropping task");
            return;
        }
        Ok(_) => {}
        Err(e) => {
            error!(chat_id = dest.0, error = %e, "registry read failed, dropping task");
            return;
        }
    }

    // Open breaker: park the task past the pause instead of a worker.
    if let Some(delay) = ctx.limiter.breaker_delay(dest) {
        debug!(chat_id = dest.0, delay_ms = delay.as_millis() as u64, "breaker open");
        requeue_after(ctx, task, delay);
        return;
    }

    if let Err(e) = ctx.limiter.acquire(dest, task.dest_kind).await {
        // Degraded pacing beats stalled delivery.
        warn!(chat_id = dest.0, error = %e, "rate limiter unavailable, sending unpaced");
    }

    match sender::deliver(ctx.platform.as_ref(), &task).await {
        Ok(pairs) => {
            ctx.limiter.report_success(dest);
            let msg = task.message.as_ref();
            for (source_message, dest_message) in pairs {
                if let Err(e) = queries::send_log::record(
                    &ctx.db,
                    msg.source_chat,
                    source_message,
                    msg.source_user,
                    dest,
                    dest_message,
                )
                .await
                {
                    warn!(chat_id = dest.0, error = %e, "send log write failed");
                }
            }
        }
        Err(e) => handle_send_error(ctx, task, e).await,
    }
}

async fn handle_send_error(ctx: &WorkerContext, mut task: SendTask, error: PlatformError) {
    let dest = task.dest_chat;
    match error {
        PlatformError::TooManyRequests { retry_after } => {
            warn!(
                chat_id = dest.0,
                retry_after_s = retry_after.as_secs(),
                "platform rate limit hit"
            );
            ctx.limiter.report_429();
            tokio::time::sleep(retry_after).await;
            if task.attempt + 1 < MAX_ATTEMPTS {
                task.attempt += 1;
                let _ = ctx.tx.send(task).await;
            }
        }

        PlatformError::Network(reason) => {
            warn!(chat_id = dest.0, reason, "network failure");
            ctx.limiter.report_error(dest);
            if task.attempt + 1 < MAX_ATTEMPTS {
                task.attempt += 1;
                requeue_after(ctx, task, NETWORK_RETRY_DELAY);
            }
        }

        PlatformError::Forbidden | PlatformError::ChatNotFound => {
            warn!(chat_id = dest.0, error = %error, "destination lost, deactivating");
            ctx.limiter.report_error(dest);
            if let Err(e) = queries::chats::deactivate(&ctx.db, dest).await {
                error!(chat_id = dest.0, error = %e, "deactivation failed");
            }
        }

        PlatformError::Migrated { new_chat_id } => {
            warn!(
                chat_id = dest.0,
                new_chat_id = new_chat_id.0,
                "chat migrated, re-addressing"
            );
            if let Err(e) = queries::chats::rename(&ctx.db, dest, new_chat_id).await {
                error!(chat_id = dest.0, error = %e, "registry rename failed");
            }
            if task.attempt + 1 < MAX_ATTEMPTS {
                task.attempt += 1;
                task.dest_chat = new_chat_id;
                task.dest_kind = hubcast_core::ChatKind::Supergroup;
                let _ = ctx.tx.send(task).await;
            }
        }

        PlatformError::BadRequest(reason) => {
            error!(
                chat_id = dest.0,
                reason,
                payload = payload_kind(&task),
                "bad request, dropping task"
            );
            ctx.limiter.report_error(dest);
        }
    }
}

fn payload_kind(task: &SendTask) -> &'static str {
    match &task.message.payload {
        hubcast_core::MessagePayload::Text { .. } => "text",
        hubcast_core::MessagePayload::Media { kind, .. } => match kind {
            hubcast_core::MediaKind::Photo => "photo",
            hubcast_core::MediaKind::Video => "video",
            hubcast_core::MediaKind::Animation => "animation",
            hubcast_core::MediaKind::Audio => "audio",
            hubcast_core::MediaKind::Document => "document",
            hubcast_core::MediaKind::Voice => "voice",
            hubcast_core::MediaKind::VideoNote => "video_note",
            hubcast_core::MediaKind::Sticker => "sticker",
        },
        hubcast_core::MessagePayload::Album { .. } => "album",
    }
}

/// Put a task back on the queue after `delay` without blocking a worker.
fn requeue_after(ctx: &WorkerContext, task: SendTask, delay: Duration) {
    let tx = ctx.tx.clone();
    let shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(delay) => {
                let _ = tx.send(task).await;
            }
        }
    });
}
