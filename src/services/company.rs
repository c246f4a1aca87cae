// src/services/company.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{AppUserRepository, CompanyRepository},
    models::company::{
        CompanyEditView, CompanyRole, CreateCompanyPayload, CreateCompanyResponse, License,
        LicenseEdit, LicenseStatus, UpdateCompanyPayload,
    },
};
use crate::db::MembershipRepository;

#[derive(Clone)]
pub struct CompanyService {
    company_repo: CompanyRepository,
    app_user_repo: AppUserRepository,
    membership_repo: MembershipRepository,
    pool: PgPool,
}

impl CompanyService {
    pub fn new(
        company_repo: CompanyRepository,
        app_user_repo: AppUserRepository,
        membership_repo: MembershipRepository,
        pool: PgPool,
    ) -> Self {
        Self { company_repo, app_user_repo, membership_repo, pool }
    }

    /// Creates company, license and owner membership as one atomic unit.
    /// A duplicate slug fails the whole transaction; a company is never
    /// observable without its license and owner.
    pub async fn create_company(
        &self,
        payload: &CreateCompanyPayload,
    ) -> Result<CreateCompanyResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        // 1. Company
        let company = self.company_repo.create(&mut *tx, payload).await?;

        // 2. License, ACTIVE with zero seats consumed
        self.company_repo
            .create_license(&mut *tx, company.id, payload.seats, payload.expires_at)
            .await?;

        // 3. Owner profile, upserted by email (names refreshed)
        let owner = self
            .app_user_repo
            .upsert_profile(
                &mut *tx,
                &payload.owner_email,
                Some(&payload.owner_first_name),
                Some(&payload.owner_last_name),
            )
            .await?;

        // 4. OWNER membership
        self.membership_repo
            .upsert(&mut *tx, company.id, owner.id, CompanyRole::Owner)
            .await?;

        tx.commit().await?;

        tracing::info!(company = %company.slug, "company created");
        Ok(CreateCompanyResponse { company_id: company.id, company_slug: company.slug })
    }

    pub async fn get_for_edit(&self, company_id: Uuid) -> Result<CompanyEditView, AppError> {
        let company = self
            .company_repo
            .find_by_id(&self.pool, company_id)
            .await?
            .ok_or(AppError::NotFound("company"))?;

        let license = self
            .company_repo
            .find_license(&self.pool, company_id)
            .await?
            .map(|l| LicenseEdit { seats: l.seats, expires_at: l.expires_at });

        Ok(CompanyEditView { company, license })
    }

    /// Partial update. Seats/expiry merge into the existing license;
    /// creating one from scratch requires both. The license lookup and
    /// the create-vs-merge decision happen inside the same transaction
    /// that writes, so two concurrent updates cannot both decide to
    /// create; the loser surfaces as a conflict.
    pub async fn update_company(
        &self,
        company_id: Uuid,
        payload: &UpdateCompanyPayload,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        self.company_repo
            .find_by_id(&mut *tx, company_id)
            .await?
            .ok_or(AppError::NotFound("company"))?;

        let existing_license = if payload.touches_license() {
            self.company_repo.find_license(&mut *tx, company_id).await?
        } else {
            None
        };

        if payload.touches_license()
            && existing_license.is_none()
            && (payload.seats.is_none() || payload.expires_at.is_none())
        {
            return Err(AppError::InvalidState(
                "No existing license. Provide both seats and expiresAt to create one.".to_string(),
            ));
        }

        // A license-only update leaves the companies row alone.
        if payload.touches_company() {
            self.company_repo
                .update_fields(&mut *tx, company_id, payload)
                .await?;
        }

        if payload.touches_license() {
            if existing_license.is_some() {
                self.company_repo
                    .update_license(&mut *tx, company_id, payload.seats, payload.expires_at)
                    .await?;
            } else {
                // Both present, checked above.
                let (Some(seats), Some(expires_at)) = (payload.seats, payload.expires_at) else {
                    return Err(AppError::InvalidState("seats and expiresAt are required".to_string()));
                };
                self.company_repo
                    .create_license(&mut *tx, company_id, seats, expires_at)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    /// Unconditional administrative transition; the state machine allows
    /// any state to any state, independent of the expiry date.
    pub async fn update_license_status(
        &self,
        company_id: Uuid,
        status: LicenseStatus,
    ) -> Result<License, AppError> {
        let license = self.company_repo.set_license_status(company_id, status).await?;
        tracing::info!(company_id = %company_id, status = ?status, "license status updated");
        Ok(license)
    }

    /// Deletes the company, its license and memberships (cascade), then
    /// removes any member left with zero memberships, all in one
    /// transaction.
    pub async fn delete_company(&self, company_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let member_ids = self.company_repo.member_user_ids(&mut tx, company_id).await?;

        let deleted = self.company_repo.delete(&mut tx, company_id).await?;
        if deleted == 0 {
            return Err(AppError::NotFound("company"));
        }

        let orphans = self.app_user_repo.delete_orphans(&mut tx, &member_ids).await?;

        tx.commit().await?;

        tracing::info!(company_id = %company_id, orphans, "company deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::membership::MembershipService;
    use chrono::{Duration, Utc};

    fn service(pool: &PgPool) -> CompanyService {
        CompanyService::new(
            CompanyRepository::new(pool.clone()),
            AppUserRepository::new(pool.clone()),
            MembershipRepository::new(pool.clone()),
            pool.clone(),
        )
    }

    fn membership_service(pool: &PgPool) -> MembershipService {
        MembershipService::new(
            MembershipRepository::new(pool.clone()),
            AppUserRepository::new(pool.clone()),
            pool.clone(),
        )
    }

    fn payload(name: &str, slug: &str, owner_email: &str) -> CreateCompanyPayload {
        CreateCompanyPayload {
            name: name.to_string(),
            slug: slug.to_string(),
            address_line1: "1 rue de la Paix".to_string(),
            address_line2: None,
            postal_code: "75002".to_string(),
            city: "Paris".to_string(),
            country: "FR".to_string(),
            phone: None,
            siret: None,
            owner_email: owner_email.to_string(),
            owner_first_name: "Jean".to_string(),
            owner_last_name: "Dupont".to_string(),
            seats: 10,
            expires_at: Utc::now() + Duration::days(365),
        }
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
    async fn duplicate_slug_commits_nothing(pool: PgPool) {
        let svc = service(&pool);
        svc.create_company(&payload("Acme", "acme", "owner@acme.com"))
            .await
            .unwrap();

        let err = svc
            .create_company(&payload("Acme Clone", "acme", "clone-owner@acme.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The loser's owner upsert was rolled back with the rest.
        assert_eq!(count_users(&pool, "clone-owner@acme.com").await, 0);
        let (companies,): (i64,) = sqlx::query_as("SELECT count(*) FROM companies")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(companies, 1);
    }

    #[sqlx::test]
    async fn deleting_a_company_removes_only_orphaned_members(pool: PgPool) {
        let svc = service(&pool);
        let msvc = membership_service(&pool);

        let acme = svc
            .create_company(&payload("Acme", "acme", "solo@acme.com"))
            .await
            .unwrap();
        svc.create_company(&payload("Beta", "beta", "shared@beta.com"))
            .await
            .unwrap();
        msvc.create(acme.company_id, "shared@beta.com", CompanyRole::Member, None, None)
            .await
            .unwrap();

        svc.delete_company(acme.company_id).await.unwrap();

        // solo held only the deleted membership; shared still owns Beta.
        assert_eq!(count_users(&pool, "solo@acme.com").await, 0);
        assert_eq!(count_users(&pool, "shared@beta.com").await, 1);
    }

    #[sqlx::test]
    async fn license_only_update_leaves_the_companies_row_untouched(pool: PgPool) {
        let svc = service(&pool);
        let created = svc
            .create_company(&payload("Acme", "acme", "owner@acme.com"))
            .await
            .unwrap();

        let before = svc.get_for_edit(created.company_id).await.unwrap();

        let patch = UpdateCompanyPayload { seats: Some(25), ..Default::default() };
        svc.update_company(created.company_id, &patch).await.unwrap();

        let after = svc.get_for_edit(created.company_id).await.unwrap();
        assert_eq!(after.company.updated_at, before.company.updated_at);
        assert_eq!(after.license.unwrap().seats, 25);
    }

    #[sqlx::test]
    async fn second_license_for_a_company_is_a_conflict(pool: PgPool) {
        let svc = service(&pool);
        let created = svc
            .create_company(&payload("Acme", "acme", "owner@acme.com"))
            .await
            .unwrap();

        let repo = CompanyRepository::new(pool.clone());
        let err = repo
            .create_license(&pool, created.company_id, 5, Utc::now() + Duration::days(30))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
