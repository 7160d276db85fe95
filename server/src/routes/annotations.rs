//! Annotation routes — create, list, detail, server-side render.
//!
//! Creation requires a session; reads are public and only ever see approved
//! annotations. Body and id extractors use `WithRejection` so malformed
//! requests still get a failure envelope.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_extra::extract::WithRejection;
use uuid::Uuid;
use wire::{
    AnnotationDetail, AnnotationRecord, CreateAnnotationRequest, CreatedAnnotation, Envelope, RenderRequest,
    RenderResponse,
};

use super::ApiError;
use super::auth::AuthUser;
use crate::services::{annotation, render as render_svc};
use crate::state::AppState;

/// `POST /api/documents/{document_id}/annotations`
pub async fn create(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    auth: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<CreateAnnotationRequest>, ApiError>,
) -> Result<(StatusCode, Json<Envelope<CreatedAnnotation>>), ApiError> {
    let new = annotation::validate(&body.context, &body.comment)?;
    let created =
        annotation::create(&state.pool, &document_id, new, auth.user.id, state.config.auto_approve).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(created))))
}

/// `GET /api/documents/{document_id}/annotations`
pub async fn list(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Envelope<Vec<AnnotationRecord>>>, ApiError> {
    let records = annotation::list_approved(&state.pool, &document_id).await?;
    Ok(Json(Envelope::ok(records)))
}

/// `GET /api/annotations/{comment_id}`
pub async fn detail(
    State(state): State<AppState>,
    WithRejection(Path(comment_id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Envelope<AnnotationDetail>>, ApiError> {
    let detail = annotation::get_approved(&state.pool, comment_id).await?;
    Ok(Json(Envelope::ok(detail)))
}

/// `POST /api/documents/{document_id}/render`
pub async fn render(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<RenderRequest>, ApiError>,
) -> Result<Json<Envelope<RenderResponse>>, ApiError> {
    let response = render_svc::render_document(&state.pool, &document_id, &body).await?;
    Ok(Json(Envelope::ok(response)))
}
