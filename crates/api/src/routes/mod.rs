pub mod auth;
pub mod health;
pub mod user;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                   register (auth limiter)
/// /auth/login                      login (auth limiter)
/// /auth/refresh                    refresh (refresh limiter, CSRF)
/// /auth/logout                     logout (requires auth)
/// /auth/reset-password/request     request reset email (auth limiter)
/// /auth/reset-password             redeem reset token (auth limiter)
/// /auth/account-password           change password (requires auth)
/// /auth/verify-email/send          resend verification (requires auth)
/// /auth/verify-email               redeem verification token (public limiter)
///
/// /user/me                         current user (requires auth)
/// /user/profile                    update profile (requires auth)
/// /user/subscription-status        cached subscription state (requires auth)
///
/// /webhooks/payments               payment events (signed body; only when a
///                                  webhook secret is configured)
/// ```
///
/// Limiters are taken from `state` so every route of a class shares one
/// counter table.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .nest("/auth", auth::router(state))
        .nest("/user", user::router());

    if state.config.payments.webhook_secret.is_some() {
        routes.nest("/webhooks", webhooks::router())
    } else {
        tracing::warn!("PAYMENT_WEBHOOK_SECRET unset, payment webhooks disabled");
        routes
    }
}
