// src/handlers/dashboard.rs

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentSession,
    models::company::CompanyRole,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub company_id: Uuid,
    pub company_name: String,
    pub company_slug: String,
    pub role: CompanyRole,
}

// Company-scoped landing data. Membership in the addressed tenant is
// required; the license gate lives in the post-login router, not here.
#[utoipa::path(
    get,
    path = "/api/companies/{slug}/dashboard",
    tag = "Dashboard",
    params(("slug" = String, Path, description = "Company slug")),
    responses(
        (status = 200, description = "Dashboard for the caller's membership", body = DashboardView),
        (status = 404, description = "Caller holds no membership in this company")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_dashboard(
    State(app_state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(slug): Path<String>,
) -> Result<Json<DashboardView>, AppError> {
    let app_user = app_state.identity_service.resolve(&session).await?;

    let memberships = app_state
        .placement_service
        .memberships_of(app_user.id)
        .await?;

    let membership = memberships
        .iter()
        .find(|m| m.company_slug == slug)
        .ok_or(AppError::NotFound("company"))?;

    Ok(Json(DashboardView {
        company_id: membership.company_id,
        company_name: membership.company_name.clone(),
        company_slug: membership.company_slug.clone(),
        role: membership.role,
    }))
}
