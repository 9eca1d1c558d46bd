//! Handlers for the `/templates` resource.
//!
//! Templates are read by the admission path at create time; the CRUD
//! surface here exists so operators can manage them over the same API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use courier_core::notification::Channel;
use courier_core::template::Template;
use courier_core::CoreError;
use courier_db::repositories::TemplateRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /templates`.
#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub channel: String,
    pub content: String,
}

/// Request body for `PUT /templates/{id}`. Omitted fields are unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub channel: Option<String>,
    pub content: Option<String>,
}

/// POST /api/v1/templates
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateTemplateRequest>,
) -> AppResult<impl IntoResponse> {
    if req.name.is_empty() {
        return Err(CoreError::validation("name", "name is required").into());
    }
    if req.content.is_empty() {
        return Err(CoreError::validation("content", "content is required").into());
    }
    let channel: Channel = req.channel.parse()?;

    let template = Template::new(req.name, channel, req.content);
    TemplateRepo::create(&state.pool, &template).await?;

    tracing::info!(template_id = %template.id, name = %template.name, "Template created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// GET /api/v1/templates
pub async fn list(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Template>>>> {
    let templates = TemplateRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<Template>>> {
    let template = TemplateRepo::get_by_id(&state.pool, id).await?;
    Ok(Json(DataResponse { data: template }))
}

/// PUT /api/v1/templates/{id}
///
/// Updating the content re-derives the variable list.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTemplateRequest>,
) -> AppResult<Json<DataResponse<Template>>> {
    let mut template = TemplateRepo::get_by_id(&state.pool, id).await?;

    if let Some(channel) = &req.channel {
        template.channel = channel.parse()?;
    }
    if let Some(content) = req.content {
        if content.is_empty() {
            return Err(CoreError::validation("content", "content is required").into());
        }
        template.set_content(content);
    }

    TemplateRepo::update(&state.pool, &template).await?;
    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/templates/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    TemplateRepo::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
