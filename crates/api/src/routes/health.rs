//! Liveness and load snapshot, mounted at the root rather than `/api/v1`.

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when Postgres is unreachable.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Clients currently holding a rate-limit window, per endpoint class.
    pub limited_clients: LimitedClients,
    pub cached_subscriptions: usize,
    pub payment_webhooks: bool,
}

#[derive(Serialize)]
pub struct LimitedClients {
    pub auth: usize,
    pub refresh: usize,
    pub public: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = tollgate_db::health_check(&state.pool).await.is_ok();
    let limiters = &state.limiters;

    Json(HealthResponse {
        status: if db_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        limited_clients: LimitedClients {
            auth: limiters.auth.len(),
            refresh: limiters.refresh.len(),
            public: limiters.public.len(),
        },
        cached_subscriptions: state.subscription_cache.entry_count().await,
        payment_webhooks: state.config.payments.webhook_secret.is_some(),
    })
}

/// `GET /health`
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
