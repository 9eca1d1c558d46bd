//! Route definitions for the `/notifications` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// POST   /                    -> create
/// GET    /                    -> list
/// POST   /batch               -> create_batch
/// GET    /batch/{batch_id}    -> get_by_batch_id
/// GET    /{id}                -> get_by_id
/// DELETE /{id}                -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(notification::create).get(notification::list))
        .route("/batch", post(notification::create_batch))
        .route("/batch/{batch_id}", get(notification::get_by_batch_id))
        .route(
            "/{id}",
            get(notification::get_by_id).delete(notification::cancel),
        )
}
