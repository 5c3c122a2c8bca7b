pub mod auth;
pub mod password_reset;
pub mod user;
pub mod verification;
pub mod webhooks;
