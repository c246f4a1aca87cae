// src/config.rs

use anyhow::Context;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, time::Duration};

use crate::{
    db::{
        AppUserRepository, AuthUserRepository, CompanyRepository, DirectoryRepository,
        MembershipRepository,
    },
    services::{
        auth::AuthService, company::CompanyService, identity::IdentityService,
        membership::MembershipService, placement::PlacementService,
    },
};

// Shared application state: the explicitly constructed persistence
// handle plus the service graph built on top of it. Opened once at
// process start, dropped at shutdown; nothing hides in a global.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub identity_service: IdentityService,
    pub placement_service: PlacementService,
    pub company_service: CompanyService,
    pub membership_service: MembershipService,
    pub directory_repo: DirectoryRepository,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("database connection established");

        // Dependency graph: repositories over the pool, services over
        // the repositories. Services begin their own transactions, so
        // some also hold the pool.
        let auth_repo = AuthUserRepository::new(db_pool.clone());
        let app_user_repo = AppUserRepository::new(db_pool.clone());
        let company_repo = CompanyRepository::new(db_pool.clone());
        let membership_repo = MembershipRepository::new(db_pool.clone());
        let directory_repo = DirectoryRepository::new(db_pool.clone());

        let auth_service = AuthService::new(auth_repo, jwt_secret);
        let identity_service = IdentityService::new(app_user_repo.clone());
        let placement_service = PlacementService::new(app_user_repo.clone());
        let company_service = CompanyService::new(
            company_repo,
            app_user_repo.clone(),
            membership_repo.clone(),
            db_pool.clone(),
        );
        let membership_service =
            MembershipService::new(membership_repo, app_user_repo, db_pool.clone());

        Ok(Self {
            db_pool,
            auth_service,
            identity_service,
            placement_service,
            company_service,
            membership_service,
            directory_repo,
        })
    }
}
