// src/services/auth.rs
//
// The identity-provider role: sign-up, sign-in, bearer-token issuance
// and session resolution. The rest of the application only ever sees
// the resolved Session (subject id + email).

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AuthUserRepository,
    models::auth::{Claims, Session},
};

#[derive(Clone)]
pub struct AuthService {
    auth_repo: AuthUserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(auth_repo: AuthUserRepository, jwt_secret: String) -> Self {
        Self { auth_repo, jwt_secret }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<String, AppError> {
        // bcrypt is CPU-bound; keep it off the async workers.
        let password_clone = password.to_owned();
        let password_hash =
            tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
                .await
                .map_err(|e| anyhow::anyhow!("hashing task failed: {}", e))??;

        let user = self.auth_repo.create(email, &password_hash).await?;

        self.create_token(user.id, &user.email)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .auth_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();
        let is_password_valid =
            tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
                .await
                .map_err(|e| anyhow::anyhow!("verification task failed: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.create_token(user.id, &user.email)
    }

    /// Resolves a bearer token into the (subject id, email) pair the
    /// application core consumes.
    pub async fn resolve_session(&self, token: &str) -> Result<Session, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        // The subject must still exist; a deleted credential record
        // invalidates outstanding tokens.
        let user = self
            .auth_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        Ok(Session { auth_user_id: user.id, email: user.email })
    }

    fn create_token(&self, auth_user_id: Uuid, email: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: auth_user_id,
            email: email.to_owned(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
