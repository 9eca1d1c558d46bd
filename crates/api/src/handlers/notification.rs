//! Handlers for the `/notifications` resource.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use courier_core::notification::{
    Channel, Notification, NotificationFilter, NotificationPage, Status,
};
use courier_core::types::Timestamp;
use courier_dispatch::CreateNotification;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::router::REQUEST_ID_HEADER;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Request body for `POST /notifications/batch`.
#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub notifications: Vec<CreateNotification>,
}

/// Query parameters for `GET /notifications`.
///
/// `status` and `channel` arrive as raw strings and are validated into
/// the domain enums so a typo yields a field-level validation error.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub channel: Option<String>,
    pub batch_id: Option<Uuid>,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> AppResult<NotificationFilter> {
        Ok(NotificationFilter {
            status: self
                .status
                .as_deref()
                .map(|s| s.parse::<Status>())
                .transpose()?,
            channel: self
                .channel
                .as_deref()
                .map(|c| c.parse::<Channel>())
                .transpose()?,
            batch_id: self.batch_id,
            start_date: self.start_date,
            end_date: self.end_date,
            page: self.page,
            page_size: self.page_size,
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Record the request's correlation id in the notification metadata, so
/// status-update subscribers can tie envelopes back to the originating
/// HTTP request. A caller-supplied `correlation_id` entry wins.
fn attach_correlation_id(req: &mut CreateNotification, headers: &HeaderMap) {
    let Some(correlation_id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return;
    };

    let metadata = req
        .metadata
        .get_or_insert_with(|| serde_json::Value::Object(Default::default()));
    if let serde_json::Value::Object(map) = metadata {
        map.entry("correlation_id")
            .or_insert_with(|| serde_json::Value::String(correlation_id.to_string()));
    }
}

/// POST /api/v1/notifications
///
/// Admit a single notification. Returns the persisted record with its
/// server-assigned id and initial status.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut req): Json<CreateNotification>,
) -> AppResult<impl IntoResponse> {
    attach_correlation_id(&mut req, &headers);
    let notification = state.admission.create(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: notification }),
    ))
}

/// POST /api/v1/notifications/batch
///
/// Admit up to 1000 notifications atomically under a shared batch id.
pub async fn create_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut req): Json<BatchCreateRequest>,
) -> AppResult<impl IntoResponse> {
    for item in &mut req.notifications {
        attach_correlation_id(item, &headers);
    }
    let notifications = state.admission.create_batch(req.notifications).await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: notifications,
        }),
    ))
}

/// GET /api/v1/notifications
///
/// List notifications with optional status/channel/batch/date filters.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<DataResponse<NotificationPage>>> {
    let filter = query.into_filter()?;
    let page = state.admission.list(&filter).await?;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/notifications/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<Notification>>> {
    let notification = state.admission.get(id).await?;
    Ok(Json(DataResponse { data: notification }))
}

/// GET /api/v1/notifications/batch/{batch_id}
pub async fn get_by_batch_id(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<DataResponse<Vec<Notification>>>> {
    let notifications = state.admission.get_batch(batch_id).await?;
    Ok(Json(DataResponse {
        data: notifications,
    }))
}

/// DELETE /api/v1/notifications/{id}
///
/// Cancel a notification that has not yet been picked up. The queue token
/// is left behind; the worker that pops it re-reads the record and drops
/// it.
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.admission.cancel(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
