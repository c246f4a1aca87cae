// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::get_me,
        handlers::post_login::post_login,

        // --- Admin: Companies ---
        handlers::companies::list_companies,
        handlers::companies::create_company,
        handlers::companies::get_company,
        handlers::companies::update_company,
        handlers::companies::update_license_status,
        handlers::companies::delete_company,

        // --- Admin: Memberships ---
        handlers::company_users::list_memberships,
        handlers::company_users::create_membership,
        handlers::company_users::update_membership_role,
        handlers::company_users::delete_membership,

        // --- Dashboard ---
        handlers::dashboard::get_dashboard,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::AuthUser,
            models::auth::RegisterPayload,
            models::auth::LoginPayload,
            models::auth::AuthResponse,

            // --- Users ---
            models::user::PlatformRole,
            models::user::AppUser,

            // --- Companies ---
            models::company::Company,
            models::company::LicenseStatus,
            models::company::License,
            models::company::CompanyRole,
            models::company::Membership,
            models::company::CreateCompanyPayload,
            models::company::UpdateCompanyPayload,
            models::company::UpdateLicenseStatusPayload,
            models::company::CreateCompanyResponse,
            models::company::LicenseEdit,
            models::company::CompanyEditView,

            // --- Directory ---
            models::directory::CompanySort,
            models::directory::SortOrder,
            models::directory::CompanyRow,
            models::directory::CompanyPage,
            models::directory::MembershipSort,
            models::directory::MembershipRow,
            models::directory::MembershipPage,

            // --- Payloads ---
            handlers::company_users::CreateMembershipPayload,
            handlers::company_users::UpdateMembershipRolePayload,
            handlers::dashboard::DashboardView,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-up, sign-in and post-login routing"),
        (name = "Users", description = "Resolved application user"),
        (name = "Admin: Companies", description = "Company and license administration"),
        (name = "Admin: Memberships", description = "Cross-tenant membership administration"),
        (name = "Dashboard", description = "Company-scoped landing data")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}
