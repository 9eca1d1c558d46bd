//! Per-channel delivery worker pools.
//!
//! Each worker runs an unbounded loop: acquire a rate-limit slot, pop a
//! token, re-read the canonical record, call the provider, persist the
//! outcome, and publish the transition. Failed retryable sends back off
//! exponentially and re-enter the queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use courier_core::notification::{Channel, Notification, Status};
use courier_core::provider::{ProviderError, ProviderRequest};
use courier_core::queue::QueueItem;
use courier_core::retry::backoff_delay;
use courier_db::DbError;
use courier_events::StatusSink;
use courier_queue::{PriorityQueue, RateLimiter};

use crate::provider::Provider;
use crate::store::NotificationStore;

/// How long an idle worker sleeps when its channel queue is empty.
const EMPTY_QUEUE_BACKOFF: Duration = Duration::from_millis(100);

/// Ceiling on waiting for workers to drain during shutdown.
const STOP_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Worker pool sizing and retry policy.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    pub sms_workers: usize,
    pub email_workers: usize,
    pub push_workers: usize,
    pub max_retries: i32,
    pub base_delay: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            sms_workers: 5,
            email_workers: 5,
            push_workers: 5,
            max_retries: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkerPool
// ---------------------------------------------------------------------------

/// Shared dependencies for every worker task.
struct WorkerContext {
    store: Arc<dyn NotificationStore>,
    queue: Arc<PriorityQueue>,
    limiter: Arc<RateLimiter>,
    provider: Arc<dyn Provider>,
    status: Arc<dyn StatusSink>,
    max_retries: i32,
    base_delay: Duration,
}

/// Fixed-size pool of delivery workers per channel.
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn all workers. The provided token is the pool's shutdown
    /// signal; cancelling it (or calling [`stop`](Self::stop)) drains the
    /// pool.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        store: Arc<dyn NotificationStore>,
        queue: Arc<PriorityQueue>,
        limiter: Arc<RateLimiter>,
        provider: Arc<dyn Provider>,
        status: Arc<dyn StatusSink>,
        config: WorkerPoolConfig,
        cancel: CancellationToken,
    ) -> Self {
        let ctx = Arc::new(WorkerContext {
            store,
            queue,
            limiter,
            provider,
            status,
            max_retries: config.max_retries,
            base_delay: config.base_delay,
        });

        let mut handles = Vec::new();
        let channels = [
            (Channel::Sms, config.sms_workers),
            (Channel::Email, config.email_workers),
            (Channel::Push, config.push_workers),
        ];

        for (channel, count) in channels {
            for worker_id in 0..count {
                let ctx = Arc::clone(&ctx);
                let cancel = cancel.clone();
                handles.push(tokio::spawn(async move {
                    worker_loop(ctx, channel, worker_id, cancel).await;
                }));
            }
        }

        tracing::info!(
            sms_workers = config.sms_workers,
            email_workers = config.email_workers,
            push_workers = config.push_workers,
            "Worker pool started"
        );

        Self { cancel, handles }
    }

    /// Signal shutdown and wait for all workers, bounded by a 30-second
    /// ceiling. In-flight provider calls finish; no new calls begin.
    pub async fn stop(self) {
        self.cancel.cancel();

        let drain = async {
            for handle in self.handles {
                let _ = handle.await;
            }
        };

        match tokio::time::timeout(STOP_TIMEOUT, drain).await {
            Ok(()) => tracing::info!("Worker pool stopped gracefully"),
            Err(_) => tracing::warn!("Worker pool stop timed out"),
        }
    }
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

async fn worker_loop(
    ctx: Arc<WorkerContext>,
    channel: Channel,
    worker_id: usize,
    cancel: CancellationToken,
) {
    tracing::info!(channel = %channel, worker_id, "Worker started");

    loop {
        // Cooperative block until the rate limiter grants a slot.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ctx.limiter.wait(channel) => {}
        }

        let Some(item) = ctx.queue.dequeue(channel).await else {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(EMPTY_QUEUE_BACKOFF) => {}
            }
            continue;
        };

        // Do not begin another provider call once shutdown is underway;
        // put the token back so the record is not stranded.
        if cancel.is_cancelled() {
            ctx.queue.enqueue(item).await;
            break;
        }

        if let Err(e) = process_item(&ctx, &item, &cancel).await {
            tracing::error!(
                channel = %channel,
                worker_id,
                notification_id = %item.notification_id,
                error = %e,
                "Failed to process notification"
            );
        }
    }

    tracing::info!(channel = %channel, worker_id, "Worker stopped");
}

/// Handle one dequeued token end to end.
async fn process_item(
    ctx: &WorkerContext,
    item: &QueueItem,
    cancel: &CancellationToken,
) -> Result<(), DbError> {
    // The store is the source of truth; the token is advisory.
    let mut notification = match ctx.store.get_by_id(item.notification_id).await {
        Ok(n) => n,
        Err(DbError::NotFound) => {
            tracing::warn!(
                notification_id = %item.notification_id,
                "Notification not found, dropping token"
            );
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    // Already handled or withdrawn; duplicate tokens land here.
    if matches!(
        notification.status,
        Status::Sent | Status::Delivered | Status::Cancelled
    ) {
        return Ok(());
    }

    notification.mark_as_processing();
    ctx.store.update(&notification).await?;
    ctx.status.publish_status(&notification);

    let request = ProviderRequest {
        to: notification.recipient.clone(),
        channel: notification.channel.to_string(),
        content: notification.content.clone(),
    };

    match ctx.provider.send(&request).await {
        Ok(response) => {
            notification.mark_as_sent(response.message_id);
            ctx.store.update(&notification).await?;
            ctx.status.publish_status(&notification);
            tracing::info!(
                notification_id = %notification.id,
                external_id = notification.external_id.as_deref().unwrap_or(""),
                "Notification sent"
            );
            Ok(())
        }
        Err(err) => handle_send_error(ctx, notification, err, cancel).await,
    }
}

/// Apply the retry policy to a failed send.
async fn handle_send_error(
    ctx: &WorkerContext,
    mut notification: Notification,
    err: ProviderError,
    cancel: &CancellationToken,
) -> Result<(), DbError> {
    if !err.retryable {
        notification.mark_as_failed(&err.message);
        ctx.store.update(&notification).await?;
        ctx.status.publish_status(&notification);
        tracing::error!(
            notification_id = %notification.id,
            error = %err.message,
            "Notification failed permanently"
        );
        return Ok(());
    }

    notification.increment_retry();

    if notification.retry_count >= ctx.max_retries {
        notification.mark_as_failed("max retries exceeded");
        ctx.store.update(&notification).await?;
        ctx.status.publish_status(&notification);
        tracing::error!(
            notification_id = %notification.id,
            retry_count = notification.retry_count,
            "Notification failed after max retries"
        );
        return Ok(());
    }

    let delay = backoff_delay(notification.retry_count, ctx.base_delay);

    notification.mark_as_queued();
    ctx.store.update(&notification).await?;
    ctx.status.publish_status(&notification);

    tracing::warn!(
        notification_id = %notification.id,
        retry_count = notification.retry_count,
        delay_ms = delay.as_millis() as u64,
        error = %err,
        "Notification will be retried"
    );

    tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        _ = tokio::time::sleep(delay) => {}
    }

    ctx.queue
        .enqueue(QueueItem::for_notification(&notification))
        .await;

    Ok(())
}
