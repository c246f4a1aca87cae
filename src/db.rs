pub mod app_user_repo;
pub use app_user_repo::AppUserRepository;
pub mod auth_repo;
pub use auth_repo::AuthUserRepository;
pub mod company_repo;
pub use company_repo::CompanyRepository;
pub mod directory_repo;
pub use directory_repo::DirectoryRepository;
pub mod membership_repo;
pub use membership_repo::MembershipRepository;
