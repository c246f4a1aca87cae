// src/models/directory.rs
//
// Types for the administrative listing queries: pagination, free-text
// search, whitelisted sort keys and structured filters over companies
// and memberships.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::company::{CompanyRole, LicenseStatus};

// ---
// Dates are exposed in two parallel server-side forms so server and
// client renders agree byte-for-byte: a machine-readable instant and a
// short display label. No client-local-timezone drift.
// ---

pub fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn short_label(dt: DateTime<Utc>) -> String {
    dt.format("%d/%m/%Y").to_string()
}

// ---
// Sorting
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum CompanySort {
    Name,
    Slug,
    CreatedAt,
    UpdatedAt,
    // License-derived keys: companies without a license sort as NULL
    // (position follows Postgres defaults, stable via the id tiebreak).
    Status,
    SeatsUsed,
}

impl CompanySort {
    pub fn sql(self) -> &'static str {
        match self {
            CompanySort::Name => "c.name",
            CompanySort::Slug => "c.slug",
            CompanySort::CreatedAt => "c.created_at",
            CompanySort::UpdatedAt => "c.updated_at",
            CompanySort::Status => "l.status",
            CompanySort::SeatsUsed => "l.seats_used",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

// ---
// Status filter, including the "no license at all" sentinel.
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    /// No filtering on license status.
    Any,
    /// Only companies with no license row ("NONE" sentinel).
    Unlicensed,
    Status(LicenseStatus),
}

impl StatusFilter {
    /// Parses the `status` query parameter. Empty/absent means no filter.
    pub fn parse(raw: Option<&str>) -> Option<StatusFilter> {
        match raw.unwrap_or("") {
            "" => Some(StatusFilter::Any),
            "NONE" => Some(StatusFilter::Unlicensed),
            "ACTIVE" => Some(StatusFilter::Status(LicenseStatus::Active)),
            "SUSPENDED" => Some(StatusFilter::Status(LicenseStatus::Suspended)),
            "EXPIRED" => Some(StatusFilter::Status(LicenseStatus::Expired)),
            _ => None,
        }
    }

    /// Text form bound into the SQL predicate ("" disables the filter).
    pub fn as_param(self) -> &'static str {
        match self {
            StatusFilter::Any => "",
            StatusFilter::Unlicensed => "NONE",
            StatusFilter::Status(LicenseStatus::Active) => "ACTIVE",
            StatusFilter::Status(LicenseStatus::Suspended) => "SUSPENDED",
            StatusFilter::Status(LicenseStatus::Expired) => "EXPIRED",
        }
    }
}

// ---
// Companies listing
// ---

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CompaniesQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive match against company name or slug.
    pub q: Option<String>,
    pub sort: Option<CompanySort>,
    pub order: Option<SortOrder>,
    /// ACTIVE | SUSPENDED | EXPIRED | NONE (no license) | "" (any)
    pub status: Option<String>,
    /// 1 = only companies holding a license.
    pub with_license: Option<u8>,
    /// Exact-match country filter.
    pub country: Option<String>,
    pub seats_min: Option<i32>,
    pub seats_max: Option<i32>,
}

impl CompaniesQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(10).max(1)
    }

    pub fn sort(&self) -> CompanySort {
        self.sort.unwrap_or(CompanySort::CreatedAt)
    }

    pub fn order(&self) -> SortOrder {
        self.order.unwrap_or(SortOrder::Desc)
    }

    pub fn with_license(&self) -> bool {
        self.with_license == Some(1)
    }

    /// Row offset for the requested page. Saturating: an absurd page
    /// number yields the (empty) last page, never an overflow.
    pub fn offset(&self) -> i64 {
        self.page().saturating_sub(1).saturating_mul(self.per_page())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub country: Option<String>,

    #[serde(rename = "createdAtISO")]
    pub created_at_iso: String,
    pub created_at_label: String,
    #[serde(rename = "updatedAtISO")]
    pub updated_at_iso: String,
    pub updated_at_label: String,

    // License fields flattened; all null when the company has no license.
    pub license_status: Option<LicenseStatus>,
    pub license_seats: Option<i32>,
    pub license_seats_used: Option<i32>,
    #[serde(rename = "licenseExpiresAtISO")]
    pub license_expires_at_iso: Option<String>,
    pub license_expires_at_label: Option<String>,

    pub users_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyPage {
    pub rows: Vec<CompanyRow>,
    /// Total under the same filter predicate as `rows`, not an
    /// unfiltered table count.
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

// ---
// Memberships listing
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum MembershipSort {
    CreatedAt,
    Company,
    User,
    Role,
}

impl MembershipSort {
    pub fn sql(self) -> &'static str {
        match self {
            MembershipSort::CreatedAt => "m.created_at",
            MembershipSort::Company => "c.name",
            MembershipSort::User => "u.email",
            MembershipSort::Role => "m.role",
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MembershipsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Case-insensitive match against user email/first/last name or
    /// company name/slug.
    pub q: Option<String>,
    pub company_id: Option<Uuid>,
    pub role: Option<CompanyRole>,
    pub sort: Option<MembershipSort>,
    pub order: Option<SortOrder>,
}

impl MembershipsQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(10).max(1)
    }

    pub fn sort(&self) -> MembershipSort {
        self.sort.unwrap_or(MembershipSort::CreatedAt)
    }

    pub fn order(&self) -> SortOrder {
        self.order.unwrap_or(SortOrder::Desc)
    }

    pub fn offset(&self) -> i64 {
        self.page().saturating_sub(1).saturating_mul(self.per_page())
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub company_slug: String,
    pub app_user_id: Uuid,
    pub user_email: String,
    pub user_first_name: Option<String>,
    pub user_last_name: Option<String>,
    pub role: CompanyRole,
    #[serde(rename = "createdAtISO")]
    pub created_at_iso: String,
    pub created_at_label: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MembershipPage {
    pub rows: Vec<MembershipRow>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_filter_distinguishes_none_sentinel_from_stored_statuses() {
        assert_eq!(StatusFilter::parse(Some("NONE")), Some(StatusFilter::Unlicensed));
        assert_eq!(
            StatusFilter::parse(Some("SUSPENDED")),
            Some(StatusFilter::Status(LicenseStatus::Suspended))
        );
        assert_eq!(StatusFilter::parse(Some("")), Some(StatusFilter::Any));
        assert_eq!(StatusFilter::parse(None), Some(StatusFilter::Any));
        assert_eq!(StatusFilter::parse(Some("bogus")), None);
    }

    #[test]
    fn sort_keys_map_to_whitelisted_columns_only() {
        assert_eq!(CompanySort::SeatsUsed.sql(), "l.seats_used");
        assert_eq!(CompanySort::Status.sql(), "l.status");
        assert_eq!(MembershipSort::User.sql(), "u.email");
    }

    #[test]
    fn pagination_defaults_and_floors() {
        let q = CompaniesQuery {
            page: Some(0),
            per_page: None,
            q: None,
            sort: None,
            order: None,
            status: None,
            with_license: None,
            country: None,
            seats_min: None,
            seats_max: None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), 10);
        assert_eq!(q.sort(), CompanySort::CreatedAt);
        assert_eq!(q.order(), SortOrder::Desc);
        assert!(!q.with_license());
        assert_eq!(q.offset(), 0);
    }

    #[test]
    fn offset_saturates_on_absurd_page_numbers() {
        let q = CompaniesQuery {
            page: Some(i64::MAX),
            per_page: Some(i64::MAX),
            q: None,
            sort: None,
            order: None,
            status: None,
            with_license: None,
            country: None,
            seats_min: None,
            seats_max: None,
        };
        assert_eq!(q.offset(), i64::MAX);

        let q = CompaniesQuery { page: Some(3), per_page: Some(25), ..q };
        assert_eq!(q.offset(), 50);
    }

    #[test]
    fn date_pair_is_stable_and_server_side() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 7, 14, 30, 0).unwrap();
        assert_eq!(iso(dt), "2026-03-07T14:30:00.000Z");
        assert_eq!(short_label(dt), "07/03/2026");
    }
}
