// src/services/membership.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AppUserRepository, MembershipRepository},
    models::company::{CompanyRole, Membership},
};

#[derive(Clone)]
pub struct MembershipService {
    membership_repo: MembershipRepository,
    app_user_repo: AppUserRepository,
    pool: PgPool,
}

impl MembershipService {
    pub fn new(
        membership_repo: MembershipRepository,
        app_user_repo: AppUserRepository,
        pool: PgPool,
    ) -> Self {
        Self { membership_repo, app_user_repo, pool }
    }

    /// Find-or-create the user by email, then upsert the membership on
    /// the (company, user) pair. Adding the same e-mail twice updates
    /// the role instead of duplicating the row.
    pub async fn create(
        &self,
        company_id: Uuid,
        email: &str,
        role: CompanyRole,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Membership, AppError> {
        let mut tx = self.pool.begin().await?;

        let user = self
            .app_user_repo
            .find_or_create_by_email(&mut tx, email, first_name, last_name)
            .await?;

        let membership = self
            .membership_repo
            .upsert(&mut *tx, company_id, user.id, role)
            .await?;

        tx.commit().await?;
        Ok(membership)
    }

    pub async fn update_role(
        &self,
        membership_id: Uuid,
        role: CompanyRole,
    ) -> Result<Membership, AppError> {
        self.membership_repo.update_role(membership_id, role).await
    }

    /// Deletes the membership and, inside the same transaction, the
    /// user when this was their last membership (orphan cleanup).
    pub async fn delete(&self, membership_id: Uuid) -> Result<(), AppError> {
        let membership = self
            .membership_repo
            .find_by_id(membership_id)
            .await?
            .ok_or(AppError::NotFound("membership"))?;

        let mut tx = self.pool.begin().await?;

        self.membership_repo.delete(&mut tx, membership_id).await?;
        self.app_user_repo
            .delete_orphans(&mut tx, &[membership.app_user_id])
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(pool: &PgPool) -> MembershipService {
        MembershipService::new(
            MembershipRepository::new(pool.clone()),
            AppUserRepository::new(pool.clone()),
            pool.clone(),
        )
    }

    async fn insert_company(pool: &PgPool, name: &str, slug: &str) -> Uuid {
        let (id,): (Uuid,) =
            sqlx::query_as("INSERT INTO companies (name, slug) VALUES ($1, $2) RETURNING id")
                .bind(name)
                .bind(slug)
                .fetch_one(pool)
                .await
                .unwrap();
        id
    }

    async fn count_users(pool: &PgPool, email: &str) -> i64 {
        let (n,): (i64,) = sqlx::query_as("SELECT count(*) FROM app_users WHERE email = $1")
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap();
        n
    }

    #[sqlx::test]
    async fn deleting_the_last_membership_removes_the_user(pool: PgPool) {
        let svc = service(&pool);
        let acme = insert_company(&pool, "Acme", "acme").await;

        let membership = svc
            .create(acme, "temp@acme.com", CompanyRole::Member, None, None)
            .await
            .unwrap();
        assert_eq!(count_users(&pool, "temp@acme.com").await, 1);

        svc.delete(membership.id).await.unwrap();
        assert_eq!(count_users(&pool, "temp@acme.com").await, 0);
    }

    #[sqlx::test]
    async fn deleting_one_of_several_memberships_keeps_the_user(pool: PgPool) {
        let svc = service(&pool);
        let acme = insert_company(&pool, "Acme", "acme").await;
        let beta = insert_company(&pool, "Beta", "beta").await;

        let in_acme = svc
            .create(acme, "both@acme.com", CompanyRole::Member, None, None)
            .await
            .unwrap();
        svc.create(beta, "both@acme.com", CompanyRole::Admin, None, None)
            .await
            .unwrap();

        svc.delete(in_acme.id).await.unwrap();
        assert_eq!(count_users(&pool, "both@acme.com").await, 1);
    }

    #[sqlx::test]
    async fn deleting_an_unknown_membership_is_not_found(pool: PgPool) {
        let svc = service(&pool);
        let err = svc.delete(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("membership")));
    }
}
