//! Auth routes: sign-in redirect, current actor, logout, dev session.

use axum::extract::{FromRef, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Redirect};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;
use wire::{Actor, E_NOT_AUTHENTICATED, E_NOT_FOUND, E_STORE_UNAVAILABLE, Envelope};

use super::ApiError;
use crate::services::session;
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Session token from the `session_token` cookie, else a bearer token.
pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(token) = jar.get(COOKIE_NAME).map(Cookie::value).map(str::trim).filter(|t| !t.is_empty()) {
        return Some(token.to_owned());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

fn not_authenticated() -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, E_NOT_AUTHENTICATED, "sign in to continue")
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user resolved from the session token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or_else(not_authenticated)?;

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, &token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "session lookup failed");
                ApiError::new(StatusCode::SERVICE_UNAVAILABLE, E_STORE_UNAVAILABLE, "session lookup failed")
            })?
            .ok_or_else(not_authenticated)?;

        Ok(Self { user, token })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct SignInQuery {
    return_to: Option<String>,
}

/// `GET /api/auth/sign-in` — redirect to the identity page, then back to `return_to`.
pub async fn sign_in(State(state): State<AppState>, Query(query): Query<SignInQuery>) -> Redirect {
    let return_to = query.return_to.as_deref().filter(|r| !r.trim().is_empty()).unwrap_or("/");
    Redirect::temporary(&state.config.sign_in_redirect(return_to))
}

/// `GET /api/auth/me` — the signed-in actor.
pub async fn me(auth: AuthUser) -> Json<Envelope<Actor>> {
    Json(Envelope::ok(auth.user.actor()))
}

/// `POST /api/auth/logout` — delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, user_id = %auth.user.id, "session delete failed");
    }

    let mut cookie = session_cookie(String::new(), state.config.cookie_secure);
    cookie.set_max_age(Duration::ZERO);
    (CookieJar::new().add(cookie), StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct DevSession {
    pub token: String,
    pub actor: Actor,
}

/// `POST /api/dev/session` — session bootstrap without the identity page.
///
/// Enabled only when `DEV_AUTH_BYPASS=true`.
pub async fn dev_session(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    if !state.config.dev_auth_bypass {
        return Err(ApiError::new(StatusCode::NOT_FOUND, E_NOT_FOUND, "not found"));
    }

    let unavailable = |e: sqlx::Error| {
        tracing::error!(error = %e, "dev session bootstrap failed");
        ApiError::new(StatusCode::SERVICE_UNAVAILABLE, E_STORE_UNAVAILABLE, "dev session bootstrap failed")
    };
    let user_id = session::upsert_dev_user(&state.pool).await.map_err(unavailable)?;
    let token = session::create_session(&state.pool, user_id).await.map_err(unavailable)?;
    let user = session::validate_session(&state.pool, &token)
        .await
        .map_err(unavailable)?
        .ok_or_else(not_authenticated)?;

    tracing::info!(%user_id, "dev session issued");
    let jar = CookieJar::new().add(session_cookie(token.clone(), state.config.cookie_secure));
    Ok((jar, Json(Envelope::ok(DevSession { token, actor: user.actor() }))))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
