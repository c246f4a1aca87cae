pub mod auth;
pub mod company;
pub mod identity;
pub mod membership;
pub mod placement;
