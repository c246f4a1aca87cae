// src/models/company.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Company (the tenant)
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    // URL-safe identifier, globally unique.
    pub slug: String,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub siret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---
// 2. License (entitlement record, zero or one per company)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "license_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum LicenseStatus {
    Active,
    Suspended,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: Uuid,
    pub company_id: Uuid,
    pub seats: i32,
    // Tracked but never enforced against `seats`; seat capacity is
    // advisory (billing-side), so membership creation must not check it.
    pub seats_used: i32,
    pub status: LicenseStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl License {
    /// Access gate evaluated at every gating decision. The stored status
    /// and the computed date expiry are each sufficient on their own:
    /// an ACTIVE license past its expiry still blocks, and a SUSPENDED
    /// license blocks no matter how far away its expiry is.
    pub fn is_blocking(&self, now: DateTime<Utc>) -> bool {
        self.status == LicenseStatus::Suspended
            || self.status == LicenseStatus::Expired
            || self.expires_at < now
    }
}

// ---
// 3. Membership (the role-bearing user<->company link)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "company_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum CompanyRole {
    Owner,
    Admin,
    Member,
}

impl CompanyRole {
    /// Fixed precedence used for post-login placement: OWNER > ADMIN > MEMBER.
    /// This is the single source of truth; nothing may depend on row order.
    pub const PRECEDENCE: [CompanyRole; 3] =
        [CompanyRole::Owner, CompanyRole::Admin, CompanyRole::Member];
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub company_id: Uuid,
    pub app_user_id: Uuid,
    pub role: CompanyRole,
    pub created_at: DateTime<Utc>,
}

// A membership with its company and license fetched eagerly, as the
// placement logic consumes it.
#[derive(Debug, Clone)]
pub struct MembershipDetail {
    pub membership_id: Uuid,
    pub role: CompanyRole,
    pub company_id: Uuid,
    pub company_name: String,
    pub company_slug: String,
    pub license: Option<License>,
}

// ---
// 4. API payloads
// ---

// Canonical creation policy: the license pair (seats, expiresAt) is
// required up front, so a company is never created half-licensed.
#[derive(Debug, Deserialize, validator::Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyPayload {
    #[validate(length(min = 2, message = "Name is required."))]
    pub name: String,
    #[validate(
        length(min = 2, message = "Slug is required."),
        regex(path = *SLUG_RE, message = "Use lowercase letters, numbers and dashes.")
    )]
    #[schema(example = "acme")]
    pub slug: String,
    #[validate(length(min = 1, message = "Address is required."))]
    pub address_line1: String,
    pub address_line2: Option<String>,
    #[validate(length(min = 2, message = "Postal code is required."))]
    pub postal_code: String,
    #[validate(length(min = 1, message = "City is required."))]
    pub city: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub phone: Option<String>,
    pub siret: Option<String>,

    #[validate(email(message = "A valid owner e-mail is required."))]
    pub owner_email: String,
    #[validate(length(min = 1, message = "First name is required."))]
    pub owner_first_name: String,
    #[validate(length(min = 1, message = "Last name is required."))]
    pub owner_last_name: String,

    #[validate(range(min = 1, message = "Seats must be a positive integer."))]
    pub seats: i32,
    pub expires_at: DateTime<Utc>,
}

fn default_country() -> String {
    "FR".to_string()
}

pub static SLUG_RE: std::sync::LazyLock<regex::Regex> =
    std::sync::LazyLock::new(|| regex::Regex::new(r"^[a-z0-9-]+$").unwrap());

// Partial update; absent fields are left untouched. seats/expiresAt
// apply to the license (see CompanyService::update_company).
#[derive(Debug, Default, Deserialize, validator::Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyPayload {
    #[validate(length(min = 2, message = "Name is too short."))]
    pub name: Option<String>,
    #[validate(
        length(min = 2, message = "Slug is too short."),
        regex(path = *SLUG_RE, message = "Use lowercase letters, numbers and dashes.")
    )]
    pub slug: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub siret: Option<String>,
    #[validate(range(min = 1, message = "Seats must be a positive integer."))]
    pub seats: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UpdateCompanyPayload {
    /// True when at least one company column is being set. A license-only
    /// update must not touch the companies row (or its updated_at).
    pub fn touches_company(&self) -> bool {
        self.name.is_some()
            || self.slug.is_some()
            || self.address_line1.is_some()
            || self.address_line2.is_some()
            || self.postal_code.is_some()
            || self.city.is_some()
            || self.country.is_some()
            || self.phone.is_some()
            || self.siret.is_some()
    }

    pub fn touches_license(&self) -> bool {
        self.seats.is_some() || self.expires_at.is_some()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLicenseStatusPayload {
    pub status: LicenseStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyResponse {
    pub company_id: Uuid,
    pub company_slug: String,
}

// License summary embedded in the edit view.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LicenseEdit {
    pub seats: i32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyEditView {
    #[serde(flatten)]
    pub company: Company,
    pub license: Option<LicenseEdit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

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
    fn active_unexpired_license_does_not_block() {
        let lic = license(LicenseStatus::Active, Duration::days(365));
        assert!(!lic.is_blocking(Utc::now()));
    }

    #[test]
    fn suspended_license_blocks_even_when_unexpired() {
        let lic = license(LicenseStatus::Suspended, Duration::days(365));
        assert!(lic.is_blocking(Utc::now()));
    }

    #[test]
    fn expired_status_blocks_even_with_future_expiry_date() {
        let lic = license(LicenseStatus::Expired, Duration::days(365));
        assert!(lic.is_blocking(Utc::now()));
    }

    #[test]
    fn past_expiry_date_blocks_even_when_status_is_active() {
        let lic = license(LicenseStatus::Active, Duration::days(-1));
        assert!(lic.is_blocking(Utc::now()));
    }
}
