//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod blacklist_repo;
pub mod email_verification_repo;
pub mod password_reset_repo;
pub mod refresh_token_repo;
pub mod user_repo;

pub use blacklist_repo::BlacklistRepo;
pub use email_verification_repo::EmailVerificationRepo;
pub use password_reset_repo::PasswordResetRepo;
pub use refresh_token_repo::RefreshTokenRepo;
pub use user_repo::UserRepo;
