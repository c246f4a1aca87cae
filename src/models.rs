pub mod auth;
pub mod company;
pub mod directory;
pub mod user;
