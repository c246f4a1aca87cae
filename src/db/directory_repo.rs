// src/db/directory_repo.rs
//
// Filtered, sorted, paginated views over companies and memberships for
// the administrative tables. Every filter is ANDed; the page of rows
// and the total are computed inside one transaction against the same
// predicate, so the count always matches what is listed.
//
// Sort keys come from a closed enum and are spliced as whitelisted
// column names; every user-supplied value is bound, never spliced.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::company::{CompanyRole, LicenseStatus},
    models::directory::{
        CompaniesQuery, CompanyPage, CompanyRow, MembershipPage, MembershipRow, MembershipsQuery,
        StatusFilter, iso, short_label,
    },
};

// Shared by the row query and the count query.
//
// $1 q, $2 country, $3 withLicense, $4 status ('' any, 'NONE' = no
// license row, else stored status), $5/$6 seat range. An empty bound
// value disables its clause.
const COMPANY_FILTER: &str = r#"
      ($1 = '' OR c.name ILIKE '%' || $1 || '%' OR c.slug ILIKE '%' || $1 || '%')
  AND ($2 = '' OR c.country = $2)
  AND (NOT $3 OR l.id IS NOT NULL)
  AND (
        $4 = ''
        OR ($4 = 'NONE' AND l.id IS NULL)
        OR l.status::text = $4
      )
  AND ($5::int4 IS NULL OR l.seats >= $5)
  AND ($6::int4 IS NULL OR l.seats <= $6)
"#;

// $1 companyId (NULL = any), $2 role ('' = any), $3 q.
const MEMBERSHIP_FILTER: &str = r#"
      ($1::uuid IS NULL OR m.company_id = $1)
  AND ($2 = '' OR m.role::text = $2)
  AND (
        $3 = ''
        OR u.email      ILIKE '%' || $3 || '%'
        OR u.first_name ILIKE '%' || $3 || '%'
        OR u.last_name  ILIKE '%' || $3 || '%'
        OR c.name       ILIKE '%' || $3 || '%'
        OR c.slug       ILIKE '%' || $3 || '%'
      )
"#;

#[derive(Debug, sqlx::FromRow)]
struct CompanyListRow {
    id: Uuid,
    name: String,
    slug: String,
    country: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    license_status: Option<LicenseStatus>,
    license_seats: Option<i32>,
    license_seats_used: Option<i32>,
    license_expires_at: Option<DateTime<Utc>>,
    users_count: i64,
}

impl CompanyListRow {
    fn into_row(self) -> CompanyRow {
        CompanyRow {
            id: self.id,
            name: self.name,
            slug: self.slug,
            country: self.country,
            created_at_iso: iso(self.created_at),
            created_at_label: short_label(self.created_at),
            updated_at_iso: iso(self.updated_at),
            updated_at_label: short_label(self.updated_at),
            license_status: self.license_status,
            license_seats: self.license_seats,
            license_seats_used: self.license_seats_used,
            license_expires_at_iso: self.license_expires_at.map(iso),
            license_expires_at_label: self.license_expires_at.map(short_label),
            users_count: self.users_count,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipListRow {
    id: Uuid,
    company_id: Uuid,
    company_name: String,
    company_slug: String,
    app_user_id: Uuid,
    user_email: String,
    user_first_name: Option<String>,
    user_last_name: Option<String>,
    role: CompanyRole,
    created_at: DateTime<Utc>,
}

impl MembershipListRow {
    fn into_row(self) -> MembershipRow {
        MembershipRow {
            id: self.id,
            company_id: self.company_id,
            company_name: self.company_name,
            company_slug: self.company_slug,
            app_user_id: self.app_user_id,
            user_email: self.user_email,
            user_first_name: self.user_first_name,
            user_last_name: self.user_last_name,
            role: self.role,
            created_at_iso: iso(self.created_at),
            created_at_label: short_label(self.created_at),
        }
    }
}

fn role_param(role: Option<CompanyRole>) -> &'static str {
    match role {
        None => "",
        Some(CompanyRole::Owner) => "OWNER",
        Some(CompanyRole::Admin) => "ADMIN",
        Some(CompanyRole::Member) => "MEMBER",
    }
}

#[derive(Clone)]
pub struct DirectoryRepository {
    pool: PgPool,
}

impl DirectoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn companies_page(
        &self,
        query: &CompaniesQuery,
        status: StatusFilter,
    ) -> Result<CompanyPage, AppError> {
        let page = query.page();
        let per_page = query.per_page();
        let offset = query.offset();

        let q = query.q.as_deref().unwrap_or("");
        let country = query.country.as_deref().unwrap_or("");

        // License-derived sort keys place unlicensed companies at the
        // NULL end; the id tiebreak keeps the order deterministic.
        let rows_sql = format!(
            r#"
            SELECT
                c.id, c.name, c.slug, c.country, c.created_at, c.updated_at,
                l.status     AS license_status,
                l.seats      AS license_seats,
                l.seats_used AS license_seats_used,
                l.expires_at AS license_expires_at,
                (SELECT count(*) FROM memberships m WHERE m.company_id = c.id) AS users_count
            FROM companies c
            LEFT JOIN licenses l ON l.company_id = c.id
            WHERE {COMPANY_FILTER}
            ORDER BY {} {}, c.id ASC
            LIMIT $7 OFFSET $8
            "#,
            query.sort().sql(),
            query.order().sql(),
        );

        let count_sql = format!(
            r#"
            SELECT count(*)
            FROM companies c
            LEFT JOIN licenses l ON l.company_id = c.id
            WHERE {COMPANY_FILTER}
            "#
        );

        let mut tx = self.pool.begin().await?;

        let items = sqlx::query_as::<_, CompanyListRow>(&rows_sql)
            .bind(q)
            .bind(country)
            .bind(query.with_license())
            .bind(status.as_param())
            .bind(query.seats_min)
            .bind(query.seats_max)
            .bind(per_page)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await?;

        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(q)
            .bind(country)
            .bind(query.with_license())
            .bind(status.as_param())
            .bind(query.seats_min)
            .bind(query.seats_max)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(CompanyPage {
            rows: items.into_iter().map(CompanyListRow::into_row).collect(),
            total,
            page,
            per_page,
        })
    }

    pub async fn memberships_page(
        &self,
        query: &MembershipsQuery,
    ) -> Result<MembershipPage, AppError> {
        let page = query.page();
        let per_page = query.per_page();
        let offset = query.offset();

        let q = query.q.as_deref().unwrap_or("");
        let role = role_param(query.role);

        let rows_sql = format!(
            r#"
            SELECT
                m.id,
                c.id   AS company_id,
                c.name AS company_name,
                c.slug AS company_slug,
                u.id   AS app_user_id,
                u.email      AS user_email,
                u.first_name AS user_first_name,
                u.last_name  AS user_last_name,
                m.role, m.created_at
            FROM memberships m
            JOIN companies c ON c.id = m.company_id
            JOIN app_users u ON u.id = m.app_user_id
            WHERE {MEMBERSHIP_FILTER}
            ORDER BY {} {}, m.id ASC
            LIMIT $4 OFFSET $5
            "#,
            query.sort().sql(),
            query.order().sql(),
        );

        let count_sql = format!(
            r#"
            SELECT count(*)
            FROM memberships m
            JOIN companies c ON c.id = m.company_id
            JOIN app_users u ON u.id = m.app_user_id
            WHERE {MEMBERSHIP_FILTER}
            "#
        );

        let mut tx = self.pool.begin().await?;

        let items = sqlx::query_as::<_, MembershipListRow>(&rows_sql)
            .bind(query.company_id)
            .bind(role)
            .bind(q)
            .bind(per_page)
            .bind(offset)
            .fetch_all(&mut *tx)
            .await?;

        let (total,): (i64,) = sqlx::query_as(&count_sql)
            .bind(query.company_id)
            .bind(role)
            .bind(q)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(MembershipPage {
            rows: items.into_iter().map(MembershipListRow::into_row).collect(),
            total,
            page,
            per_page,
        })
    }
}
