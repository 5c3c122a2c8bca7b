//! User entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tollgate_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub latest_status: Option<String>,
    pub latest_product_id: Option<DbId>,
    pub latest_variant_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
    pub created_at: Timestamp,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            email_verified: user.email_verified,
            created_at: user.created_at,
        }
    }
}

/// The user's most recent subscription state.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct SubscriptionStatus {
    #[sqlx(rename = "latest_status")]
    pub status: Option<String>,
    #[sqlx(rename = "latest_product_id")]
    pub product_id: Option<DbId>,
    #[sqlx(rename = "latest_variant_id")]
    pub variant_id: Option<DbId>,
}

/// DTO for creating a new user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// DTO for updating profile fields. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfile {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// DTO for overwriting the latest subscription fields from a payment event.
#[derive(Debug, Clone)]
pub struct UpdateSubscription {
    pub status: String,
    pub product_id: Option<DbId>,
    pub variant_id: Option<DbId>,
}
