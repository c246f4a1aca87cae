// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::{auth::Session, user::AppUser},
};

fn bearer_token(request: &axum::http::Request<axum::body::Body>) -> Option<&str> {
    request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

// Validates the bearer token and stores the resolved Session in the
// request extensions. Application-user resolution is left to whoever
// needs it, mirroring how placement and identity are separate steps.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(&request) else {
        return Err(AppError::InvalidToken);
    };

    let session = app_state.auth_service.resolve_session(token).await?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

// Adds application-user resolution and the SUPER_ADMIN platform-role
// check on top of auth_guard. The admin surface is an API, so the
// failure mode here is 401/403, not a redirect; only the post-login
// router speaks in redirects.
pub async fn admin_guard(
    State(app_state): State<AppState>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = bearer_token(&request) else {
        return Err(AppError::InvalidToken);
    };

    let session = app_state.auth_service.resolve_session(token).await?;
    let app_user = app_state.identity_service.resolve(&session).await?;

    if !app_user.is_super_admin() {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(app_user);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated session placed by auth_guard.
pub struct CurrentSession(pub Session);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or(AppError::InvalidToken)
    }
}

/// Extractor for the super-admin AppUser placed by admin_guard.
pub struct AdminUser(pub AppUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AppUser>()
            .cloned()
            .map(AdminUser)
            .ok_or(AppError::Forbidden)
    }
}
