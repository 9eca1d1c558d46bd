//! Admission service: the single create/cancel path.
//!
//! Every notification enters the pipeline here. The service deduplicates
//! via idempotency key, validates, expands templates, persists the record,
//! and either enqueues it immediately or leaves it deferred for the
//! scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use courier_core::error::CoreError;
use courier_core::notification::{
    Channel, Notification, NotificationFilter, NotificationPage, Priority, Status,
};
use courier_core::queue::QueueItem;
use courier_core::template::Template;
use courier_core::types::Timestamp;
use courier_db::DbError;
use courier_events::StatusSink;
use courier_queue::PriorityQueue;

use crate::error::ServiceError;
use crate::store::{NotificationStore, TemplateStore};

/// Maximum number of notifications accepted in one batch request.
pub const MAX_BATCH_SIZE: usize = 1000;

// ---------------------------------------------------------------------------
// Request DTO
// ---------------------------------------------------------------------------

/// A request to admit one notification.
///
/// `channel` and `priority` are accepted as raw strings and validated here
/// so malformed values surface as field-level validation errors rather
/// than deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateNotification {
    pub recipient: String,
    pub channel: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<Timestamp>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub template_name: Option<String>,
    #[serde(default)]
    pub template_vars: HashMap<String, String>,
}

// ---------------------------------------------------------------------------
// AdmissionService
// ---------------------------------------------------------------------------

/// Validates, deduplicates, persists, then enqueues or defers.
pub struct AdmissionService {
    store: Arc<dyn NotificationStore>,
    templates: Arc<dyn TemplateStore>,
    queue: Arc<PriorityQueue>,
    status: Arc<dyn StatusSink>,
}

impl AdmissionService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        templates: Arc<dyn TemplateStore>,
        queue: Arc<PriorityQueue>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            store,
            templates,
            queue,
            status,
        }
    }

    /// Admit a single notification.
    ///
    /// A repeated idempotency key returns the original record unchanged,
    /// whether the repeat is detected up front or lost a persistence race.
    pub async fn create(&self, req: CreateNotification) -> Result<Notification, ServiceError> {
        if let Some(key) = &req.idempotency_key {
            if let Some(existing) = self.store.get_by_idempotency_key(key).await? {
                return Ok(existing);
            }
        }

        let mut notification = self.build_notification(&req).await?;
        notification.idempotency_key = req.idempotency_key.clone();

        if let Err(err) = self.store.create(&notification).await {
            if matches!(err, DbError::IdempotencyConflict) {
                // Lost a race with a concurrent identical-key creation;
                // the winner is the record of truth.
                if let Some(key) = &req.idempotency_key {
                    return Ok(self
                        .store
                        .get_by_idempotency_key(key)
                        .await?
                        .ok_or(DbError::NotFound)?);
                }
            }
            return Err(err.into());
        }

        if notification.status == Status::Pending {
            self.enqueue_notification(&mut notification).await;
        }

        tracing::info!(
            notification_id = %notification.id,
            channel = %notification.channel,
            status = %notification.status,
            "Notification created"
        );

        Ok(notification)
    }

    /// Admit up to [`MAX_BATCH_SIZE`] notifications atomically.
    ///
    /// Any validation failure rejects the whole batch before persistence,
    /// identified by position. All records share a freshly minted batch id.
    pub async fn create_batch(
        &self,
        requests: Vec<CreateNotification>,
    ) -> Result<Vec<Notification>, ServiceError> {
        if requests.is_empty() {
            return Err(CoreError::validation(
                "notifications",
                "at least one notification is required",
            )
            .into());
        }
        if requests.len() > MAX_BATCH_SIZE {
            return Err(CoreError::BatchSizeExceeded {
                size: requests.len(),
                max: MAX_BATCH_SIZE,
            }
            .into());
        }

        let batch_id = Uuid::new_v4();
        let mut notifications = Vec::with_capacity(requests.len());

        for (index, req) in requests.iter().enumerate() {
            let mut notification = self
                .build_notification(req)
                .await
                .map_err(|e| e.at_index(index))?;
            notification.batch_id = Some(batch_id);
            notification.idempotency_key = req.idempotency_key.clone();
            notifications.push(notification);
        }

        self.store.create_batch(&notifications).await?;

        let queue_items: Vec<QueueItem> = notifications
            .iter()
            .filter(|n| n.status == Status::Pending)
            .map(QueueItem::for_notification)
            .collect();

        if !queue_items.is_empty() {
            self.queue.enqueue_batch(queue_items).await;
            for n in &mut notifications {
                if n.status == Status::Pending {
                    n.mark_as_queued();
                    if let Err(e) = self.store.update_status(n.id, Status::Queued).await {
                        tracing::error!(
                            notification_id = %n.id,
                            error = %e,
                            "Failed to mark batched notification queued"
                        );
                    }
                }
            }
        }

        tracing::info!(
            batch_id = %batch_id,
            count = notifications.len(),
            "Batch created"
        );

        Ok(notifications)
    }

    /// Cancel a notification that has not yet been picked up by a worker.
    ///
    /// The queue token (if any) is left behind; the worker that pops it
    /// re-reads the record, sees the cancelled status, and drops it.
    pub async fn cancel(&self, id: Uuid) -> Result<Notification, ServiceError> {
        let mut notification = self.store.get_by_id(id).await?;

        if !notification.can_cancel() {
            return Err(CoreError::CannotCancel {
                status: notification.status,
            }
            .into());
        }

        notification.mark_as_cancelled();
        self.store.update(&notification).await?;
        self.status.publish_status(&notification);

        tracing::info!(notification_id = %id, "Notification cancelled");

        Ok(notification)
    }

    pub async fn get(&self, id: Uuid) -> Result<Notification, ServiceError> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn get_batch(&self, batch_id: Uuid) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.store.get_by_batch_id(batch_id).await?)
    }

    pub async fn list(&self, filter: &NotificationFilter) -> Result<NotificationPage, ServiceError> {
        Ok(self.store.list(filter).await?)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Validate one request and construct the record (without persisting).
    async fn build_notification(
        &self,
        req: &CreateNotification,
    ) -> Result<Notification, ServiceError> {
        if req.recipient.is_empty() {
            return Err(CoreError::validation("recipient", "recipient is required").into());
        }

        let channel: Channel = req.channel.parse().map_err(ServiceError::Core)?;

        let content = match &req.template_name {
            Some(name) => self.render_template(name, &req.template_vars).await?,
            None => req.content.clone().unwrap_or_default(),
        };

        if content.is_empty() {
            return Err(CoreError::validation("content", "content is required").into());
        }
        Notification::validate_content_length(channel, &content)?;

        let mut notification = Notification::new(req.recipient.clone(), channel, content);

        if let Some(priority) = req.priority.as_deref().filter(|p| !p.is_empty()) {
            notification.priority = priority.parse::<Priority>().map_err(ServiceError::Core)?;
        }

        if let Some(scheduled_at) = req.scheduled_at {
            if scheduled_at <= Utc::now() {
                return Err(CoreError::validation(
                    "scheduled_at",
                    "scheduled time must be in the future",
                )
                .into());
            }
            notification.scheduled_at = Some(scheduled_at);
            notification.status = Status::Scheduled;
        }

        if let Some(metadata) = &req.metadata {
            notification.metadata = metadata.clone();
        }

        Ok(notification)
    }

    /// Resolve and render a template, failing when required variables are
    /// absent from the supplied map.
    async fn render_template(
        &self,
        name: &str,
        vars: &HashMap<String, String>,
    ) -> Result<String, ServiceError> {
        let template: Template = self
            .templates
            .get_by_name(name)
            .await?
            .ok_or_else(|| CoreError::TemplateNotFound(name.to_string()))?;

        let missing = template.missing_variables(vars);
        if !missing.is_empty() {
            return Err(CoreError::MissingVariables(missing).into());
        }

        Ok(template.render(vars))
    }

    /// Enqueue a freshly admitted pending record and mark it queued.
    ///
    /// The record was already persisted; a failure to persist the `queued`
    /// transition is logged and left for the worker to reconcile when it
    /// pops the token and re-reads the row.
    async fn enqueue_notification(&self, notification: &mut Notification) {
        self.queue
            .enqueue(QueueItem::for_notification(notification))
            .await;

        notification.mark_as_queued();
        if let Err(e) = self.store.update(notification).await {
            tracing::error!(
                notification_id = %notification.id,
                error = %e,
                "Failed to mark notification queued"
            );
        }
    }
}
