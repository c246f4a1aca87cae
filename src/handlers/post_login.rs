// src/handlers/post_login.rs
//
// The post-authentication router: the only entry point whose failure
// mode is a redirect rather than a typed API error, because its caller
// is a browser mid-login.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Redirect,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::AppError,
    config::AppState,
    services::placement::LoginError,
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PostLoginQuery {
    /// Optional path to return to, honored only inside the resolved
    /// tenant's path space.
    pub return_to: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[utoipa::path(
    get,
    path = "/api/post-login",
    tag = "Auth",
    params(PostLoginQuery),
    responses(
        (status = 303, description = "Redirect to the admin area, the tenant dashboard, \
            or /login?error={unauth|no-company|license}")
    ),
    security(("api_jwt" = []))
)]
pub async fn post_login(
    State(app_state): State<AppState>,
    Query(query): Query<PostLoginQuery>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    // 1. Session. No session is not an API error here: the browser is
    // sent back to the login page with the matching error code.
    let session = match bearer_token(&headers) {
        Some(token) => match app_state.auth_service.resolve_session(token).await {
            Ok(session) => session,
            Err(AppError::InvalidToken) => {
                return Ok(Redirect::to(&LoginError::Unauth.login_path()));
            }
            Err(e) => return Err(e),
        },
        None => return Ok(Redirect::to(&LoginError::Unauth.login_path())),
    };

    // 2. Application user (created or linked on first sight).
    let app_user = app_state.identity_service.resolve(&session).await?;

    // 3.-6. Super-admin bypass, best membership, license gate, returnTo.
    let dest = app_state
        .placement_service
        .resolve_destination(&app_user, query.return_to.as_deref())
        .await?;

    tracing::info!(user = %app_user.email, dest = %dest, "post-login placement");
    Ok(Redirect::to(&dest))
}
