// src/db/company_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::company::{Company, CreateCompanyPayload, License, LicenseStatus, UpdateCompanyPayload},
};

const COMPANY_COLUMNS: &str = "id, name, slug, address_line1, address_line2, postal_code, \
     city, country, phone, siret, created_at, updated_at";

const LICENSE_COLUMNS: &str =
    "id, company_id, seats, seats_used, status, expires_at, created_at, updated_at";

#[derive(Clone)]
pub struct CompanyRepository {
    pool: PgPool,
}

impl CompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        payload: &CreateCompanyPayload,
    ) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (
                name, slug, address_line1, address_line2,
                postal_code, city, country, phone, siret
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(&payload.name)
        .bind(&payload.slug)
        .bind(&payload.address_line1)
        .bind(&payload.address_line2)
        .bind(&payload.postal_code)
        .bind(&payload.city)
        .bind(&payload.country)
        .bind(&payload.phone)
        .bind(&payload.siret)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Two concurrent creates with the same slug: the loser's
            // transaction fails cleanly as a conflict, nothing partial.
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("slug".to_string());
                }
            }
            e.into()
        })?;

        Ok(company)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Company>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_company = sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(maybe_company)
    }

    /// Partial field update; absent values keep the stored column.
    pub async fn update_fields<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &UpdateCompanyPayload,
    ) -> Result<Company, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies SET
                name          = COALESCE($2, name),
                slug          = COALESCE($3, slug),
                address_line1 = COALESCE($4, address_line1),
                address_line2 = COALESCE($5, address_line2),
                postal_code   = COALESCE($6, postal_code),
                city          = COALESCE($7, city),
                country       = COALESCE($8, country),
                phone         = COALESCE($9, phone),
                siret         = COALESCE($10, siret),
                updated_at    = now()
            WHERE id = $1
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.slug)
        .bind(&payload.address_line1)
        .bind(&payload.address_line2)
        .bind(&payload.postal_code)
        .bind(&payload.city)
        .bind(&payload.country)
        .bind(&payload.phone)
        .bind(&payload.siret)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("slug".to_string());
                }
            }
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound("company"))?;

        Ok(company)
    }

    /// Member user ids collected before a delete, so orphan cleanup can
    /// run inside the same transaction after the cascade.
    pub async fn member_user_ids(
        &self,
        conn: &mut PgConnection,
        company_id: Uuid,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT DISTINCT app_user_id FROM memberships WHERE company_id = $1")
                .bind(company_id)
                .fetch_all(conn)
                .await?;
        Ok(ids.into_iter().map(|(id,)| id).collect())
    }

    /// Deletes the company; license and memberships go with it via
    /// ON DELETE CASCADE.
    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // License (1:1 with company)
    // ---

    pub async fn find_license<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
    ) -> Result<Option<License>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let maybe_license = sqlx::query_as::<_, License>(&format!(
            "SELECT {LICENSE_COLUMNS} FROM licenses WHERE company_id = $1"
        ))
        .bind(company_id)
        .fetch_optional(executor)
        .await?;
        Ok(maybe_license)
    }

    pub async fn create_license<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        seats: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<License, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let license = sqlx::query_as::<_, License>(&format!(
            r#"
            INSERT INTO licenses (company_id, seats, seats_used, status, expires_at)
            VALUES ($1, $2, 0, 'ACTIVE', $3)
            RETURNING {LICENSE_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(seats)
        .bind(expires_at)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            // Two concurrent updates both creating the license: the
            // loser hits the company_id unique constraint.
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::Conflict("license".to_string());
                }
            }
            e.into()
        })?;
        Ok(license)
    }

    /// Merges the supplied seat/expiry values into the existing license.
    pub async fn update_license<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        seats: Option<i32>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<License, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let license = sqlx::query_as::<_, License>(&format!(
            r#"
            UPDATE licenses SET
                seats      = COALESCE($2, seats),
                expires_at = COALESCE($3, expires_at),
                updated_at = now()
            WHERE company_id = $1
            RETURNING {LICENSE_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(seats)
        .bind(expires_at)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("license"))?;
        Ok(license)
    }

    /// Administrative status set: any state to any state; the expiry
    /// date is not consulted.
    pub async fn set_license_status(
        &self,
        company_id: Uuid,
        status: LicenseStatus,
    ) -> Result<License, AppError> {
        let license = sqlx::query_as::<_, License>(&format!(
            r#"
            UPDATE licenses
            SET status = $2, updated_at = now()
            WHERE company_id = $1
            RETURNING {LICENSE_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("license"))?;
        Ok(license)
    }
}
