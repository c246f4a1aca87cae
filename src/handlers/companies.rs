// src/handlers/companies.rs
//
// Administrative company management: the paged directory, transactional
// create/delete, partial updates and the license status switch.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AdminUser,
    models::company::{
        CompanyEditView, CreateCompanyPayload, CreateCompanyResponse, License,
        UpdateCompanyPayload, UpdateLicenseStatusPayload,
    },
    models::directory::{CompaniesQuery, CompanyPage, StatusFilter},
};

#[utoipa::path(
    get,
    path = "/api/admin/companies",
    tag = "Admin: Companies",
    params(CompaniesQuery),
    responses(
        (status = 200, description = "Filtered, sorted page of companies", body = CompanyPage),
        (status = 403, description = "Caller is not a super admin")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_companies(
    State(app_state): State<AppState>,
    Query(query): Query<CompaniesQuery>,
) -> Result<Json<CompanyPage>, AppError> {
    let status = StatusFilter::parse(query.status.as_deref()).ok_or_else(|| {
        AppError::InvalidState(
            "status must be one of ACTIVE, SUSPENDED, EXPIRED, NONE or empty".to_string(),
        )
    })?;

    let page = app_state.directory_repo.companies_page(&query, status).await?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/admin/companies",
    tag = "Admin: Companies",
    request_body = CreateCompanyPayload,
    responses(
        (status = 201, description = "Company, license and owner membership created", body = CreateCompanyResponse),
        (status = 409, description = "Slug already taken; nothing committed")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(payload): Json<CreateCompanyPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let created = app_state.company_service.create_company(&payload).await?;
    tracing::info!(actor = %admin.email, company = %created.company_slug, "company created by admin");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/admin/companies/{id}",
    tag = "Admin: Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Company fields plus license summary", body = CompanyEditView),
        (status = 404, description = "Unknown company")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyEditView>, AppError> {
    let view = app_state.company_service.get_for_edit(id).await?;
    Ok(Json(view))
}

#[utoipa::path(
    patch,
    path = "/api/admin/companies/{id}",
    tag = "Admin: Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = UpdateCompanyPayload,
    responses(
        (status = 204, description = "Updated"),
        (status = 404, description = "Unknown company"),
        (status = 422, description = "License creation needs both seats and expiresAt")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_company(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;

    app_state.company_service.update_company(id, &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/admin/companies/{id}/license-status",
    tag = "Admin: Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = UpdateLicenseStatusPayload,
    responses(
        (status = 200, description = "Status set unconditionally", body = License),
        (status = 404, description = "Company has no license")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_license_status(
    State(app_state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateLicenseStatusPayload>,
) -> Result<Json<License>, AppError> {
    let license = app_state
        .company_service
        .update_license_status(id, payload.status)
        .await?;
    Ok(Json(license))
}

#[utoipa::path(
    delete,
    path = "/api/admin/companies/{id}",
    tag = "Admin: Companies",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 204, description = "Company, license, memberships and orphaned users removed"),
        (status = 404, description = "Unknown company")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_company(
    State(app_state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    app_state.company_service.delete_company(id).await?;
    tracing::info!(actor = %admin.email, company_id = %id, "company deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}
