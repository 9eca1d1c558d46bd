//! Periodic promotion of due deferred notifications.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use courier_core::notification::Status;
use courier_core::queue::QueueItem;
use courier_db::DbError;
use courier_queue::PriorityQueue;

use crate::store::NotificationStore;

/// Default sweep interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Default maximum records promoted per sweep.
pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// Background sweeper that moves `scheduled` records whose time has come
/// into the delivery queue.
pub struct Scheduler {
    store: Arc<dyn NotificationStore>,
    queue: Arc<PriorityQueue>,
    interval: Duration,
    batch_size: i64,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        queue: Arc<PriorityQueue>,
        interval: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            store,
            queue,
            interval,
            batch_size,
        }
    }

    /// Run the sweep loop until cancelled. The first sweep happens
    /// immediately on startup.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            batch_size = self.batch_size,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Scheduler sweep failed");
                    }
                }
            }
        }
    }

    /// One sweep: read due records, enqueue tokens, then mark the records
    /// queued.
    ///
    /// Enqueue happens before the status update: a crash in between leaves
    /// a duplicate token in the queue, which workers drop after re-reading
    /// the record. The inverse order could lose work.
    pub async fn sweep(&self) -> Result<(), DbError> {
        let due = self
            .store
            .list_due_scheduled(Utc::now(), self.batch_size)
            .await?;

        if due.is_empty() {
            return Ok(());
        }

        let items: Vec<QueueItem> = due.iter().map(QueueItem::for_notification).collect();
        self.queue.enqueue_batch(items).await;

        for n in &due {
            if let Err(e) = self.store.update_status(n.id, Status::Queued).await {
                tracing::error!(
                    notification_id = %n.id,
                    error = %e,
                    "Failed to mark scheduled notification queued"
                );
            }
        }

        tracing::info!(count = due.len(), "Scheduled notifications promoted");
        Ok(())
    }
}
