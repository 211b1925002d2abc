use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeData;
use crate::models::template::{
    CategoryCount, NewTemplate, Pagination, RatingRequest, TemplatePage, TemplateQuery,
    TemplateRecord, TemplateSource, TemplateSummary,
};
use crate::render::{RenderOutput, Renderer};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct InlineRenderRequest {
    pub template: TemplateSource,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Runs a render on the blocking pool; expansion and layout are CPU-bound.
async fn render_blocking(
    renderer: Arc<Renderer>,
    source: TemplateSource,
    data: Option<Value>,
) -> Result<RenderOutput, AppError> {
    let data = ResumeData::new(data.unwrap_or(Value::Null));
    let output = tokio::task::spawn_blocking(move || renderer.render(&source, &data))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in render: {e}")))??;
    Ok(output)
}

/// Reads an optional render body. Only a blank body means "no data"; anything
/// else must be a valid `RenderRequest`, with or without a JSON content type.
fn parse_render_body(body: &[u8]) -> Result<RenderRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RenderRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid render request body: {e}")))
}

/// Fetches a template callers may see: inactive ones are reported as missing.
async fn active_template(state: &AppState, id: Uuid) -> Result<TemplateRecord, AppError> {
    state
        .store
        .get(id)
        .await?
        .filter(|t| t.flags.is_active)
        .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))
}

/// GET /api/v1/templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
    Query(query): Query<TemplateQuery>,
) -> Result<Json<TemplatePage>, AppError> {
    let (records, matched) = state.store.list(&query).await?;
    let pagination = Pagination::new(&query, records.len(), matched);
    Ok(Json(TemplatePage {
        templates: records.iter().map(TemplateRecord::summary).collect(),
        pagination,
    }))
}

/// GET /api/v1/templates/categories
pub async fn handle_list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryCount>>, AppError> {
    Ok(Json(state.store.categories().await?))
}

/// GET /api/v1/templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateRecord>, AppError> {
    Ok(Json(active_template(&state, id).await?))
}

/// POST /api/v1/templates
///
/// The template is rendered once against its own sample data before it is
/// stored, so markup that cannot expand is rejected up front.
pub async fn handle_create_template(
    State(state): State<AppState>,
    Json(req): Json<NewTemplate>,
) -> Result<(StatusCode, Json<TemplateRecord>), AppError> {
    req.validate()?;
    render_blocking(state.renderer.clone(), req.source.clone(), None).await?;

    let record = state.store.insert(req.into_record(Utc::now())).await?;
    info!(
        "Created template {} ({}, engine {})",
        record.id, record.name, record.source.render_engine
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/v1/templates/:id
pub async fn handle_delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete(id).await? {
        return Err(AppError::NotFound(format!("Template {id} not found")));
    }
    info!("Deleted template {id}");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/:id/render
///
/// An empty body (or no `data`) renders the template's sample data.
pub async fn handle_render_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<RenderOutput>, AppError> {
    let data = parse_render_body(&body)?.data;
    let template = active_template(&state, id).await?;
    let output = render_blocking(state.renderer.clone(), template.source, data).await?;
    state.store.record_usage(id).await?;
    Ok(Json(output))
}

/// POST /api/v1/templates/:id/use
pub async fn handle_use_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    active_template(&state, id).await?;
    state.store.record_usage(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/:id/rate
pub async fn handle_rate_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RatingRequest>,
) -> Result<Json<TemplateSummary>, AppError> {
    let rating = req.validate()?;
    active_template(&state, id).await?;
    let record = state
        .store
        .add_rating(id, rating)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Template {id} not found")))?;
    Ok(Json(record.summary()))
}

/// POST /api/v1/render
pub async fn handle_render_inline(
    State(state): State<AppState>,
    Json(req): Json<InlineRenderRequest>,
) -> Result<Json<RenderOutput>, AppError> {
    let output = render_blocking(state.renderer.clone(), req.template, req.data).await?;
    Ok(Json(output))
}
