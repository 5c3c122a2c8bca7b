//! Route definitions for inbound webhooks.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Routes mounted at `/webhooks`. Authenticated by body signature, so they
/// sit outside the session, CSRF and rate-limit layers.
///
/// ```text
/// POST /payments  -> payments
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/payments", post(webhooks::payments))
}
