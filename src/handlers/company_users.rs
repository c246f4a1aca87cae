// src/handlers/company_users.rs
//
// Administrative membership management across all tenants.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::company::{CompanyRole, Membership},
    models::directory::{MembershipPage, MembershipsQuery},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMembershipPayload {
    pub company_id: Uuid,
    #[validate(email(message = "A valid e-mail address is required."))]
    pub email: String,
    pub role: CompanyRole,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMembershipRolePayload {
    pub role: CompanyRole,
}

#[utoipa::path(
    get,
    path = "/api/admin/company-users",
    tag = "Admin: Memberships",
    params(MembershipsQuery),
    responses(
        (status = 200, description = "Filtered, sorted page of memberships", body = MembershipPage),
        (status = 403, description = "Caller is not a super admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_memberships(
    State(app_state): State<AppState>,
    Query(query): Query<MembershipsQuery>,
) -> Result<Json<MembershipPage>, AppError> {
    let page = app_state.directory_repo.memberships_page(&query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/admin/company-users",
    tag = "Admin: Memberships",
    request_body = CreateMembershipPayload,
    responses(
        (status = 201, description = "Membership created, or role updated for an existing pair", body = Membership),
        (status = 404, description = "Unknown company")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_membership(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateMembershipPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let membership = app_state
        .membership_service
        .create(
            payload.company_id,
            &payload.email,
            payload.role,
            payload.first_name.as_deref(),
            payload.last_name.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/company-users/{id}",
    tag = "Admin: Memberships",
    params(("id" = Uuid, Path, description = "Membership id")),
    request_body = UpdateMembershipRolePayload,
    responses(
        (status = 200, description = "Role updated", body = Membership),
        (status = 404, description = "Unknown membership")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_membership_role(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMembershipRolePayload>,
) -> Result<Json<Membership>, AppError> {
    let membership = app_state
        .membership_service
        .update_role(id, payload.role)
        .await?;
    Ok(Json(membership))
}

#[utoipa::path(
    delete,
    path = "/api/admin/company-users/{id}",
    tag = "Admin: Memberships",
    params(("id" = Uuid, Path, description = "Membership id")),
    responses(
        (status = 204, description = "Membership removed; user removed too if it was the last one"),
        (status = 404, description = "Unknown membership")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_membership(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.membership_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
