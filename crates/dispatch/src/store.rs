//! Persistence seams for the pipeline.
//!
//! The pipeline components hold `Arc<dyn NotificationStore>` /
//! `Arc<dyn TemplateStore>` rather than a concrete pool, so integration
//! tests can run the whole admission/worker/scheduler path against an
//! in-memory store. [`PgStore`] is the production implementation,
//! delegating to the repositories in `courier_db`.

use async_trait::async_trait;
use uuid::Uuid;

use courier_core::notification::{Notification, NotificationFilter, NotificationPage, Status};
use courier_core::template::Template;
use courier_core::types::Timestamp;
use courier_db::repositories::{NotificationRepo, TemplateRepo};
use courier_db::{DbError, DbPool};

/// Store operations the pipeline needs for notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(&self, n: &Notification) -> Result<(), DbError>;
    async fn create_batch(&self, notifications: &[Notification]) -> Result<(), DbError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Notification, DbError>;
    async fn get_by_batch_id(&self, batch_id: Uuid) -> Result<Vec<Notification>, DbError>;
    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<Notification>, DbError>;
    async fn update(&self, n: &Notification) -> Result<(), DbError>;
    async fn update_status(&self, id: Uuid, status: Status) -> Result<(), DbError>;
    async fn list(&self, filter: &NotificationFilter) -> Result<NotificationPage, DbError>;
    async fn list_due_scheduled(
        &self,
        before: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError>;
}

/// Template reads used by the admission path. Template CRUD stays on the
/// concrete repository; admission only ever resolves by name.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Option<Template>, DbError>;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn create(&self, n: &Notification) -> Result<(), DbError> {
        NotificationRepo::create(&self.pool, n).await
    }

    async fn create_batch(&self, notifications: &[Notification]) -> Result<(), DbError> {
        NotificationRepo::create_batch(&self.pool, notifications).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Notification, DbError> {
        NotificationRepo::get_by_id(&self.pool, id).await
    }

    async fn get_by_batch_id(&self, batch_id: Uuid) -> Result<Vec<Notification>, DbError> {
        NotificationRepo::get_by_batch_id(&self.pool, batch_id).await
    }

    async fn get_by_idempotency_key(&self, key: &str) -> Result<Option<Notification>, DbError> {
        NotificationRepo::get_by_idempotency_key(&self.pool, key).await
    }

    async fn update(&self, n: &Notification) -> Result<(), DbError> {
        NotificationRepo::update(&self.pool, n).await
    }

    async fn update_status(&self, id: Uuid, status: Status) -> Result<(), DbError> {
        NotificationRepo::update_status(&self.pool, id, status).await
    }

    async fn list(&self, filter: &NotificationFilter) -> Result<NotificationPage, DbError> {
        NotificationRepo::list(&self.pool, filter).await
    }

    async fn list_due_scheduled(
        &self,
        before: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        NotificationRepo::list_due_scheduled(&self.pool, before, limit).await
    }
}

#[async_trait]
impl TemplateStore for PgStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<Template>, DbError> {
        TemplateRepo::get_by_name(&self.pool, name).await
    }
}
