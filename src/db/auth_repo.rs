// src/db/auth_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::AuthUser};

// Credential store of the identity provider. Kept apart from the
// application-user repository on purpose: the core never touches this
// table outside the auth service.
#[derive(Clone)]
pub struct AuthUserRepository {
    pool: PgPool,
}

impl AuthUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>, AppError> {
        let maybe_user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM auth_users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AppError> {
        let maybe_user = sqlx::query_as::<_, AuthUser>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM auth_users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(maybe_user)
    }

    pub async fn create(&self, email: &str, password_hash: &str) -> Result<AuthUser, AppError> {
        let user = sqlx::query_as::<_, AuthUser>(
            r#"
            INSERT INTO auth_users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
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
}
