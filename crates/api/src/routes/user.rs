//! Route definitions for the `/user` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::user;
use crate::state::AppState;

/// Routes mounted at `/user`. All require authentication.
///
/// ```text
/// GET /me                   -> me
/// PUT /profile              -> update_profile
/// GET /subscription-status  -> subscription_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(user::me))
        .route("/profile", put(user::update_profile))
        .route("/subscription-status", get(user::subscription_status))
}
