pub mod auth;
pub mod companies;
pub mod company_users;
pub mod dashboard;
pub mod post_login;
