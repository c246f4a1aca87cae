// src/db/app_user_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::company::{CompanyRole, License, LicenseStatus, MembershipDetail},
    models::user::AppUser,
};

const APP_USER_COLUMNS: &str =
    "id, email, auth_user_id, first_name, last_name, platform_role, created_at, updated_at";

// Flat row for the eager membership+company+license fetch. License
// columns are all NULL when the company holds no license.
#[derive(Debug, sqlx::FromRow)]
struct MembershipDetailRow {
    membership_id: Uuid,
    role: CompanyRole,
    company_id: Uuid,
    company_name: String,
    company_slug: String,
    license_id: Option<Uuid>,
    license_seats: Option<i32>,
    license_seats_used: Option<i32>,
    license_status: Option<LicenseStatus>,
    license_expires_at: Option<DateTime<Utc>>,
    license_created_at: Option<DateTime<Utc>>,
    license_updated_at: Option<DateTime<Utc>>,
}

impl MembershipDetailRow {
    fn into_detail(self) -> MembershipDetail {
        let license = match (
            self.license_id,
            self.license_seats,
            self.license_seats_used,
            self.license_status,
            self.license_expires_at,
            self.license_created_at,
            self.license_updated_at,
        ) {
            (Some(id), Some(seats), Some(seats_used), Some(status), Some(expires_at), Some(created_at), Some(updated_at)) => {
                Some(License {
                    id,
                    company_id: self.company_id,
                    seats,
                    seats_used,
                    status,
                    expires_at,
                    created_at,
                    updated_at,
                })
            }
            _ => None,
        };

        MembershipDetail {
            membership_id: self.membership_id,
            role: self.role,
            company_id: self.company_id,
            company_name: self.company_name,
            company_slug: self.company_slug,
            license,
        }
    }
}

#[derive(Clone)]
pub struct AppUserRepository {
    pool: PgPool,
}

impl AppUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // The external-session link takes precedence over email for lookups.
    pub async fn find_by_auth_user_id(&self, auth_user_id: Uuid) -> Result<Option<AppUser>, AppError> {
        let maybe_user = sqlx::query_as::<_, AppUser>(&format!(
            "SELECT {APP_USER_COLUMNS} FROM app_users WHERE auth_user_id = $1"
        ))
        .bind(auth_user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<AppUser>, AppError> {
        let maybe_user = sqlx::query_as::<_, AppUser>(&format!(
            "SELECT {APP_USER_COLUMNS} FROM app_users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn create_linked(&self, email: &str, auth_user_id: Uuid) -> Result<AppUser, AppError> {
        let user = sqlx::query_as::<_, AppUser>(&format!(
            r#"
            INSERT INTO app_users (email, auth_user_id)
            VALUES ($1, $2)
            RETURNING {APP_USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(auth_user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("email".to_string());
                }
            }
            e.into()
        })?;

        Ok(user)
    }

    /// Attaches the external-session link to an unlinked record.
    pub async fn link_auth_user(&self, id: Uuid, auth_user_id: Uuid) -> Result<AppUser, AppError> {
        let user = sqlx::query_as::<_, AppUser>(&format!(
            r#"
            UPDATE app_users
            SET auth_user_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING {APP_USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(auth_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    /// Upserts by email, refreshing the name fields. Used when an admin
    /// designates a company owner.
    pub async fn upsert_profile<'e, E>(
        &self,
        executor: E,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<AppUser, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, AppUser>(&format!(
            r#"
            INSERT INTO app_users (email, first_name, last_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
                SET first_name = EXCLUDED.first_name,
                    last_name  = EXCLUDED.last_name,
                    updated_at = now()
            RETURNING {APP_USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(executor)
        .await?;
        Ok(user)
    }

    /// Find-or-create by email without touching names of an existing
    /// record. Used when an admin adds a membership for an e-mail.
    pub async fn find_or_create_by_email(
        &self,
        conn: &mut PgConnection,
        email: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<AppUser, AppError> {
        let existing = sqlx::query_as::<_, AppUser>(&format!(
            "SELECT {APP_USER_COLUMNS} FROM app_users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

        if let Some(user) = existing {
            return Ok(user);
        }

        let user = sqlx::query_as::<_, AppUser>(&format!(
            r#"
            INSERT INTO app_users (email, first_name, last_name)
            VALUES ($1, $2, $3)
            RETURNING {APP_USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(&mut *conn)
        .await?;
        Ok(user)
    }

    /// Removes the given users if they hold no remaining membership.
    /// Always called inside the same transaction as the membership or
    /// company delete that may have orphaned them.
    pub async fn delete_orphans(
        &self,
        conn: &mut PgConnection,
        user_ids: &[Uuid],
    ) -> Result<u64, AppError> {
        if user_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            r#"
            DELETE FROM app_users
            WHERE id = ANY($1)
              AND NOT EXISTS (
                  SELECT 1 FROM memberships m WHERE m.app_user_id = app_users.id
              )
            "#,
        )
        .bind(user_ids)
        .execute(conn)
        .await?;
        Ok(result.rows_affected())
    }

    /// All memberships of a user with company and license fetched
    /// eagerly, as the placement logic consumes them.
    pub async fn memberships_detailed(&self, app_user_id: Uuid) -> Result<Vec<MembershipDetail>, AppError> {
        let rows = sqlx::query_as::<_, MembershipDetailRow>(
            r#"
            SELECT
                m.id            AS membership_id,
                m.role          AS role,
                c.id            AS company_id,
                c.name          AS company_name,
                c.slug          AS company_slug,
                l.id            AS license_id,
                l.seats         AS license_seats,
                l.seats_used    AS license_seats_used,
                l.status        AS license_status,
                l.expires_at    AS license_expires_at,
                l.created_at    AS license_created_at,
                l.updated_at    AS license_updated_at
            FROM memberships m
            JOIN companies c ON c.id = m.company_id
            LEFT JOIN licenses l ON l.company_id = c.id
            WHERE m.app_user_id = $1
            "#,
        )
        .bind(app_user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(MembershipDetailRow::into_detail).collect())
    }
}
