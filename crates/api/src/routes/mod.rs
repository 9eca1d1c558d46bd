pub mod health;
pub mod notification;
pub mod template;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /notifications               create, list
/// /notifications/batch         batch create
/// /notifications/batch/{id}    read batch
/// /notifications/{id}          read, cancel
/// /templates                   create, list
/// /templates/{id}              read, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/notifications", notification::router())
        .nest("/templates", template::router())
}
