//! Repository for the `notifications` table.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use courier_core::notification::{Notification, NotificationFilter, NotificationPage, Status};
use courier_core::types::Timestamp;

use crate::error::DbError;
use crate::DbPool;

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, batch_id, recipient, channel, content, priority, status, \
     scheduled_at, sent_at, external_id, retry_count, idempotency_key, \
     metadata, error_message, created_at, updated_at";

/// Default page size when the caller does not specify one.
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum page size; larger requests are clamped.
const MAX_PAGE_SIZE: i64 = 100;

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// A raw row from the `notifications` table. Enum columns are stored as
/// text and parsed into the domain types on the way out.
#[derive(Debug, FromRow)]
struct NotificationRow {
    id: Uuid,
    batch_id: Option<Uuid>,
    recipient: String,
    channel: String,
    content: String,
    priority: String,
    status: String,
    scheduled_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    external_id: Option<String>,
    retry_count: i32,
    idempotency_key: Option<String>,
    metadata: serde_json::Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = DbError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: row.id,
            batch_id: row.batch_id,
            recipient: row.recipient,
            channel: row
                .channel
                .parse()
                .map_err(|_| DbError::Decode(format!("unknown channel: {}", row.channel)))?,
            content: row.content,
            priority: row
                .priority
                .parse()
                .map_err(|_| DbError::Decode(format!("unknown priority: {}", row.priority)))?,
            status: row
                .status
                .parse()
                .map_err(|_| DbError::Decode(format!("unknown status: {}", row.status)))?,
            scheduled_at: row.scheduled_at,
            sent_at: row.sent_at,
            external_id: row.external_id,
            retry_count: row.retry_count,
            idempotency_key: row.idempotency_key,
            metadata: row.metadata,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// NotificationRepo
// ---------------------------------------------------------------------------

/// Provides CRUD and listing operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a new notification.
    ///
    /// A unique violation on the idempotency key surfaces as
    /// [`DbError::IdempotencyConflict`]; callers resolve it by reading back
    /// the winning record.
    pub async fn create(pool: &DbPool, n: &Notification) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO notifications ( \
                 id, batch_id, recipient, channel, content, priority, status, \
                 scheduled_at, sent_at, external_id, retry_count, idempotency_key, \
                 metadata, error_message, created_at, updated_at \
             ) VALUES ( \
                 $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16 \
             )",
        )
        .bind(n.id)
        .bind(n.batch_id)
        .bind(&n.recipient)
        .bind(n.channel.as_str())
        .bind(&n.content)
        .bind(n.priority.as_str())
        .bind(n.status.as_str())
        .bind(n.scheduled_at)
        .bind(n.sent_at)
        .bind(&n.external_id)
        .bind(n.retry_count)
        .bind(&n.idempotency_key)
        .bind(&n.metadata)
        .bind(&n.error_message)
        .bind(n.created_at)
        .bind(n.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Insert a batch of notifications atomically: either all rows appear
    /// or none do.
    pub async fn create_batch(pool: &DbPool, notifications: &[Notification]) -> Result<(), DbError> {
        if notifications.is_empty() {
            return Ok(());
        }

        let mut tx = pool.begin().await.map_err(DbError::from)?;

        for n in notifications {
            sqlx::query(
                "INSERT INTO notifications ( \
                     id, batch_id, recipient, channel, content, priority, status, \
                     scheduled_at, sent_at, external_id, retry_count, idempotency_key, \
                     metadata, error_message, created_at, updated_at \
                 ) VALUES ( \
                     $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16 \
                 )",
            )
            .bind(n.id)
            .bind(n.batch_id)
            .bind(&n.recipient)
            .bind(n.channel.as_str())
            .bind(&n.content)
            .bind(n.priority.as_str())
            .bind(n.status.as_str())
            .bind(n.scheduled_at)
            .bind(n.sent_at)
            .bind(&n.external_id)
            .bind(n.retry_count)
            .bind(&n.idempotency_key)
            .bind(&n.metadata)
            .bind(&n.error_message)
            .bind(n.created_at)
            .bind(n.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Fetch a notification by id.
    pub async fn get_by_id(pool: &DbPool, id: Uuid) -> Result<Notification, DbError> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        let row = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or(DbError::NotFound)?;
        row.try_into()
    }

    /// Fetch all notifications in a batch, oldest first.
    pub async fn get_by_batch_id(pool: &DbPool, batch_id: Uuid) -> Result<Vec<Notification>, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE batch_id = $1 \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    /// Fetch the notification holding an idempotency key, if any.
    pub async fn get_by_idempotency_key(
        pool: &DbPool,
        key: &str,
    ) -> Result<Option<Notification>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE idempotency_key = $1");
        let row = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(key)
            .fetch_optional(pool)
            .await?;
        row.map(Notification::try_from).transpose()
    }

    /// Write the full mutable row back.
    pub async fn update(pool: &DbPool, n: &Notification) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE notifications SET \
                 batch_id = $2, recipient = $3, channel = $4, content = $5, \
                 priority = $6, status = $7, scheduled_at = $8, sent_at = $9, \
                 external_id = $10, retry_count = $11, idempotency_key = $12, \
                 metadata = $13, error_message = $14, updated_at = $15 \
             WHERE id = $1",
        )
        .bind(n.id)
        .bind(n.batch_id)
        .bind(&n.recipient)
        .bind(n.channel.as_str())
        .bind(&n.content)
        .bind(n.priority.as_str())
        .bind(n.status.as_str())
        .bind(n.scheduled_at)
        .bind(n.sent_at)
        .bind(&n.external_id)
        .bind(n.retry_count)
        .bind(&n.idempotency_key)
        .bind(&n.metadata)
        .bind(&n.error_message)
        .bind(n.updated_at)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Update only the status column, bumping `updated_at`.
    pub async fn update_status(pool: &DbPool, id: Uuid, status: Status) -> Result<(), DbError> {
        let result = sqlx::query(
            "UPDATE notifications SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// List notifications with filters and pagination.
    ///
    /// Page size is clamped to `[1, 100]`; results are ordered by
    /// `created_at` descending and returned alongside the total count.
    pub async fn list(pool: &DbPool, filter: &NotificationFilter) -> Result<NotificationPage, DbError> {
        let mut conditions = vec!["1=1".to_string()];
        let mut arg_index = 1;

        if filter.status.is_some() {
            conditions.push(format!("status = ${arg_index}"));
            arg_index += 1;
        }
        if filter.channel.is_some() {
            conditions.push(format!("channel = ${arg_index}"));
            arg_index += 1;
        }
        if filter.batch_id.is_some() {
            conditions.push(format!("batch_id = ${arg_index}"));
            arg_index += 1;
        }
        if filter.start_date.is_some() {
            conditions.push(format!("created_at >= ${arg_index}"));
            arg_index += 1;
        }
        if filter.end_date.is_some() {
            conditions.push(format!("created_at <= ${arg_index}"));
            arg_index += 1;
        }

        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) FROM notifications WHERE {where_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        if let Some(status) = filter.status {
            count_query = count_query.bind(status.as_str());
        }
        if let Some(channel) = filter.channel {
            count_query = count_query.bind(channel.as_str());
        }
        if let Some(batch_id) = filter.batch_id {
            count_query = count_query.bind(batch_id);
        }
        if let Some(start) = filter.start_date {
            count_query = count_query.bind(start);
        }
        if let Some(end) = filter.end_date {
            count_query = count_query.bind(end);
        }
        let total = count_query.fetch_one(pool).await?;

        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * page_size;

        let select_sql = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${arg_index} OFFSET ${}",
            arg_index + 1
        );
        let mut select_query = sqlx::query_as::<_, NotificationRow>(&select_sql);
        if let Some(status) = filter.status {
            select_query = select_query.bind(status.as_str());
        }
        if let Some(channel) = filter.channel {
            select_query = select_query.bind(channel.as_str());
        }
        if let Some(batch_id) = filter.batch_id {
            select_query = select_query.bind(batch_id);
        }
        if let Some(start) = filter.start_date {
            select_query = select_query.bind(start);
        }
        if let Some(end) = filter.end_date {
            select_query = select_query.bind(end);
        }
        let rows = select_query
            .bind(page_size)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        let notifications: Vec<Notification> = rows
            .into_iter()
            .map(Notification::try_from)
            .collect::<Result<_, _>>()?;

        let total_pages = (total + page_size - 1) / page_size;

        Ok(NotificationPage {
            notifications,
            total,
            page,
            page_size,
            total_pages,
        })
    }

    /// Fetch scheduled notifications due at or before `before`, soonest
    /// first, up to `limit`.
    pub async fn list_due_scheduled(
        pool: &DbPool,
        before: Timestamp,
        limit: i64,
    ) -> Result<Vec<Notification>, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE status = 'scheduled' AND scheduled_at <= $1 \
             ORDER BY scheduled_at ASC \
             LIMIT $2"
        );
        let rows = sqlx::query_as::<_, NotificationRow>(&query)
            .bind(before)
            .bind(limit)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
