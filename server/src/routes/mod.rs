//! Router assembly and the JSON error envelope.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every API response is a `wire::Envelope`. Handlers return
//! `Result<_, ApiError>`; service errors convert into [`ApiError`] through
//! the `*_error_to_status` helpers so status codes live in one place.

pub mod annotations;
pub mod auth;

use axum::Json;
use axum::Router;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wire::{E_BAD_REQUEST, Envelope, ErrorCode, WireError};

use crate::services::annotation::AnnotationError;
use crate::state::AppState;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Annotation API routes.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/documents/{document_id}/annotations",
            get(annotations::list).post(annotations::create),
        )
        .route("/api/documents/{document_id}/render", post(annotations::render))
        .route("/api/annotations/{comment_id}", get(annotations::detail))
        .route("/api/auth/sign-in", get(auth::sign_in))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/dev/session", post(auth::dev_session))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failed request: HTTP status plus the envelope error body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: WireError,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self { status, error: WireError::new(code, message) }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::<()>::err(self.error))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), E_BAD_REQUEST, rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(rejection.status(), E_BAD_REQUEST, rejection.body_text())
    }
}

pub(crate) fn annotation_error_to_status(err: &AnnotationError) -> StatusCode {
    match err {
        AnnotationError::InvalidContext | AnnotationError::InvalidComment => StatusCode::BAD_REQUEST,
        AnnotationError::NotFound(_) => StatusCode::NOT_FOUND,
        AnnotationError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AnnotationError> for ApiError {
    fn from(err: AnnotationError) -> Self {
        let status = annotation_error_to_status(&err);
        if let AnnotationError::Database(e) = &err {
            tracing::error!(error = %e, "annotation query failed");
            let mut error = WireError::new(err.error_code(), "annotation storage failed");
            error.retryable = err.retryable();
            return Self { status, error };
        }
        Self { status, error: WireError::from(&err) }
    }
}
