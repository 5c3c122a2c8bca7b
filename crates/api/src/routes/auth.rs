//! Route definitions for the `/auth` resource.

use axum::middleware::from_fn_with_state;
use axum::routing::post;
use axum::Router;

use crate::handlers::{auth, password_reset, verification};
use crate::middleware::rate_limit::enforce;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /register                 -> register          (auth limiter)
/// POST /login                    -> login             (auth limiter)
/// POST /reset-password/request   -> request_reset     (auth limiter)
/// POST /reset-password           -> reset_password    (auth limiter)
/// POST /refresh                  -> refresh           (refresh limiter)
/// POST /verify-email             -> verify            (public limiter)
/// POST /logout                   -> logout            (requires auth)
/// POST /account-password         -> change_password   (requires auth)
/// POST /verify-email/send        -> send              (requires auth)
/// ```
pub fn router(state: &AppState) -> Router<AppState> {
    let limited_auth = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route(
            "/reset-password/request",
            post(password_reset::request_reset),
        )
        .route("/reset-password", post(password_reset::reset_password))
        .route_layer(from_fn_with_state(state.limiters.auth.clone(), enforce));

    let limited_refresh = Router::new()
        .route("/refresh", post(auth::refresh))
        .route_layer(from_fn_with_state(state.limiters.refresh.clone(), enforce));

    let limited_public = Router::new()
        .route("/verify-email", post(verification::verify))
        .route_layer(from_fn_with_state(state.limiters.public.clone(), enforce));

    Router::new()
        .merge(limited_auth)
        .merge(limited_refresh)
        .merge(limited_public)
        .route("/logout", post(auth::logout))
        .route("/account-password", post(auth::change_password))
        .route("/verify-email/send", post(verification::send))
}
