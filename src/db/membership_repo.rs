// src/db/membership_repo.rs

use sqlx::{Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::company::{CompanyRole, Membership},
};

const MEMBERSHIP_COLUMNS: &str = "id, company_id, app_user_id, role, created_at";

#[derive(Clone)]
pub struct MembershipRepository {
    pool: PgPool,
}

impl MembershipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Membership>, AppError> {
        let maybe_membership = sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM memberships WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_membership)
    }

    /// At most one membership per (company, user) pair; a second insert
    /// for the same pair updates the role instead.
    pub async fn upsert<'e, E>(
        &self,
        executor: E,
        company_id: Uuid,
        app_user_id: Uuid,
        role: CompanyRole,
    ) -> Result<Membership, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            INSERT INTO memberships (company_id, app_user_id, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (company_id, app_user_id) DO UPDATE SET role = EXCLUDED.role
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(app_user_id)
        .bind(role)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_foreign_key_violation() {
                    return AppError::NotFound("company");
                }
            }
            e.into()
        })?;

        Ok(membership)
    }

    pub async fn update_role(&self, id: Uuid, role: CompanyRole) -> Result<Membership, AppError> {
        let membership = sqlx::query_as::<_, Membership>(&format!(
            r#"
            UPDATE memberships SET role = $2
            WHERE id = $1
            RETURNING {MEMBERSHIP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("membership"))?;
        Ok(membership)
    }

    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM memberships WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected())
    }
}
