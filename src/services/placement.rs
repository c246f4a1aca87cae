// src/services/placement.rs
//
// Tenant membership resolution and the post-authentication router:
// which company an authenticated user lands on, and where to send them.

use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    db::AppUserRepository,
    models::company::{CompanyRole, MembershipDetail},
    models::user::AppUser,
};

pub const ADMIN_DASHBOARD_PATH: &str = "/admin/dashboard";
pub const LOGIN_PATH: &str = "/login";

// Error codes carried back to the login page as ?error=<code>.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    Unauth,
    NoCompany,
    License,
}

impl LoginError {
    pub fn code(self) -> &'static str {
        match self {
            LoginError::Unauth => "unauth",
            LoginError::NoCompany => "no-company",
            LoginError::License => "license",
        }
    }

    pub fn login_path(self) -> String {
        format!("{LOGIN_PATH}?error={}", self.code())
    }
}

/// Selects the single best membership by fixed role precedence
/// (OWNER > ADMIN > MEMBER). A priority lookup over the role enum,
/// deliberately independent of the order rows came back in.
pub fn pick_best(memberships: &[MembershipDetail]) -> Option<&MembershipDetail> {
    CompanyRole::PRECEDENCE
        .iter()
        .find_map(|role| memberships.iter().find(|m| m.role == *role))
}

/// Computes the post-login redirect. The ordering here is part of the
/// observable contract: the super-admin check precedes membership
/// resolution (a super admin holding a tenant membership still lands in
/// the admin area), and the license gate fires before the returnTo hint
/// is considered (a blocked tenant is blocked even with a valid hint).
pub fn destination(
    user: &AppUser,
    memberships: &[MembershipDetail],
    now: DateTime<Utc>,
    return_to: Option<&str>,
) -> String {
    if user.is_super_admin() {
        return ADMIN_DASHBOARD_PATH.to_string();
    }

    let Some(best) = pick_best(memberships) else {
        // Terminal "no company" condition, not a crash.
        return LoginError::NoCompany.login_path();
    };

    if let Some(license) = &best.license {
        if license.is_blocking(now) {
            return LoginError::License.login_path();
        }
    }

    // Honor the hint only inside the resolved tenant's path space.
    if let Some(hint) = return_to {
        if hint.starts_with(&format!("/{}/", best.company_slug)) {
            return hint.to_string();
        }
    }

    format!("/{}/dashboard", best.company_slug)
}

#[derive(Clone)]
pub struct PlacementService {
    app_user_repo: AppUserRepository,
}

impl PlacementService {
    pub fn new(app_user_repo: AppUserRepository) -> Self {
        Self { app_user_repo }
    }

    /// Eager fetch of all memberships with company and license.
    pub async fn memberships_of(
        &self,
        app_user_id: uuid::Uuid,
    ) -> Result<Vec<MembershipDetail>, AppError> {
        self.app_user_repo.memberships_detailed(app_user_id).await
    }

    pub async fn resolve_destination(
        &self,
        user: &AppUser,
        return_to: Option<&str>,
    ) -> Result<String, AppError> {
        // Super admins never go through tenant selection; skip the fetch.
        if user.is_super_admin() {
            return Ok(ADMIN_DASHBOARD_PATH.to_string());
        }

        let memberships = self.app_user_repo.memberships_detailed(user.id).await?;
        Ok(destination(user, &memberships, Utc::now(), return_to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::company::{License, LicenseStatus};
    use crate::models::user::PlatformRole;
    use chrono::Duration;
    use uuid::Uuid;

    fn user(platform_role: PlatformRole) -> AppUser {
        let now = Utc::now();
        AppUser {
            id: Uuid::new_v4(),
            email: "owner@acme.com".to_string(),
            auth_user_id: Some(Uuid::new_v4()),
            first_name: None,
            last_name: None,
            platform_role,
            created_at: now,
            updated_at: now,
        }
    }

    fn membership(slug: &str, role: CompanyRole, license: Option<License>) -> MembershipDetail {
        MembershipDetail {
            membership_id: Uuid::new_v4(),
            role,
            company_id: license.as_ref().map(|l| l.company_id).unwrap_or_else(Uuid::new_v4),
            company_name: slug.to_uppercase(),
            company_slug: slug.to_string(),
            license,
        }
    }

    fn license(status: LicenseStatus, expires_in: Duration) -> License {
        let now = Utc::now();
        License {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            seats: 50,
            seats_used: 0,
            status,
            expires_at: now + expires_in,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn precedence_ignores_list_order() {
        let memberships = vec![
            membership("beta", CompanyRole::Member, None),
            membership("alpha", CompanyRole::Admin, None),
        ];
        assert_eq!(pick_best(&memberships).unwrap().company_slug, "alpha");

        let reversed: Vec<_> = memberships.into_iter().rev().collect();
        assert_eq!(pick_best(&reversed).unwrap().company_slug, "alpha");
    }

    #[test]
    fn owner_wins_over_admin_and_member() {
        let memberships = vec![
            membership("m", CompanyRole::Member, None),
            membership("o", CompanyRole::Owner, None),
            membership("a", CompanyRole::Admin, None),
        ];
        assert_eq!(pick_best(&memberships).unwrap().company_slug, "o");
    }

    #[test]
    fn super_admin_lands_in_admin_area_even_with_memberships() {
        let admin = user(PlatformRole::SuperAdmin);
        let memberships = vec![membership(
            "acme",
            CompanyRole::Owner,
            Some(license(LicenseStatus::Active, Duration::days(365))),
        )];
        assert_eq!(
            destination(&admin, &memberships, Utc::now(), Some("/acme/settings")),
            "/admin/dashboard"
        );
    }

    #[test]
    fn no_membership_redirects_to_login_with_no_company_code() {
        let u = user(PlatformRole::None);
        assert_eq!(destination(&u, &[], Utc::now(), None), "/login?error=no-company");
    }

    #[test]
    fn suspended_license_blocks_despite_valid_ownership() {
        let u = user(PlatformRole::None);
        let memberships = vec![membership(
            "acme",
            CompanyRole::Owner,
            Some(license(LicenseStatus::Suspended, Duration::days(365))),
        )];
        assert_eq!(
            destination(&u, &memberships, Utc::now(), None),
            "/login?error=license"
        );
    }

    #[test]
    fn license_gate_fires_before_return_to_hint() {
        let u = user(PlatformRole::None);
        let memberships = vec![membership(
            "acme",
            CompanyRole::Owner,
            Some(license(LicenseStatus::Active, Duration::days(-1))),
        )];
        assert_eq!(
            destination(&u, &memberships, Utc::now(), Some("/acme/settings")),
            "/login?error=license"
        );
    }

    #[test]
    fn return_to_honored_only_for_the_resolved_tenant() {
        let u = user(PlatformRole::None);
        let memberships = vec![membership(
            "acme",
            CompanyRole::Owner,
            Some(license(LicenseStatus::Active, Duration::days(365))),
        )];

        assert_eq!(
            destination(&u, &memberships, Utc::now(), Some("/acme/settings")),
            "/acme/settings"
        );
        assert_eq!(
            destination(&u, &memberships, Utc::now(), Some("/other/settings")),
            "/acme/dashboard"
        );
        // A bare "/acme" (no trailing segment) is not inside the tenant
        // path space either.
        assert_eq!(
            destination(&u, &memberships, Utc::now(), Some("/acme")),
            "/acme/dashboard"
        );
    }

    #[test]
    fn missing_license_does_not_block_placement() {
        let u = user(PlatformRole::None);
        let memberships = vec![membership("acme", CompanyRole::Member, None)];
        assert_eq!(destination(&u, &memberships, Utc::now(), None), "/acme/dashboard");
    }
}
