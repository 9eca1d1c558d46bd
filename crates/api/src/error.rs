use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use courier_core::CoreError;
use courier_db::DbError;
use courier_dispatch::ServiceError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the pipeline error types and implements [`IntoResponse`] to
/// produce consistent `{ "error": ..., "code": ... }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = classify(&self);

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn classify(err: &AppError) -> (StatusCode, &'static str, String) {
    match err {
        AppError::Service(service) => classify_service(service),
        AppError::Core(core) => classify_core(core),
        AppError::Db(db) => classify_db(db),
        AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
    }
}

fn classify_service(err: &ServiceError) -> (StatusCode, &'static str, String) {
    match err {
        ServiceError::Core(core) => classify_core(core),
        ServiceError::Db(db) => classify_db(db),
        ServiceError::BatchItem { index, source } => {
            let (status, code, message) = classify_service(source);
            (status, code, format!("notification {index}: {message}"))
        }
    }
}

fn classify_core(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation { .. } => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
        }
        CoreError::TemplateNotFound(name) => (
            StatusCode::BAD_REQUEST,
            "TEMPLATE_NOT_FOUND",
            format!("Template not found: {name}"),
        ),
        CoreError::MissingVariables(missing) => (
            StatusCode::BAD_REQUEST,
            "MISSING_VARIABLES",
            format!("Missing template variables: {}", missing.join(", ")),
        ),
        CoreError::BatchSizeExceeded { size, max } => (
            StatusCode::BAD_REQUEST,
            "BATCH_SIZE_EXCEEDED",
            format!("Batch size {size} exceeds maximum of {max}"),
        ),
        CoreError::CannotCancel { status } => (
            StatusCode::BAD_REQUEST,
            "CANNOT_CANCEL",
            format!("Notification in status {status} cannot be cancelled"),
        ),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

fn classify_db(err: &DbError) -> (StatusCode, &'static str, String) {
    match err {
        DbError::NotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        DbError::IdempotencyConflict => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "Idempotency key already used".to_string(),
        ),
        DbError::DuplicateTemplateName => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "A template with this name already exists".to_string(),
        ),
        DbError::Decode(msg) => {
            tracing::error!(error = %msg, "Row decode error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        DbError::Sqlx(e) => {
            tracing::error!(error = %e, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
