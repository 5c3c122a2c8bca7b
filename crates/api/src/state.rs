use std::sync::Arc;

use tollgate_core::rate_limit::{RateLimitPolicy, RateLimiter};
use tollgate_core::session::SessionManager;
use tollgate_db::PgTokenStore;

use crate::config::ServerConfig;
use crate::mailer::Mailer;
use crate::subscription_cache::SubscriptionCache;

/// One rate limiter per endpoint class. Classes never share counters.
#[derive(Clone)]
pub struct RateLimiters {
    /// Login, registration, password reset.
    pub auth: Arc<RateLimiter>,
    /// Session refresh.
    pub refresh: Arc<RateLimiter>,
    /// Other unauthenticated endpoints.
    pub public: Arc<RateLimiter>,
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self {
            auth: Arc::new(RateLimiter::new(RateLimitPolicy::AUTH)),
            refresh: Arc::new(RateLimiter::new(RateLimitPolicy::REFRESH)),
            public: Arc::new(RateLimiter::new(RateLimitPolicy::PUBLIC)),
        }
    }
}

impl RateLimiters {
    pub fn all(&self) -> Vec<Arc<RateLimiter>> {
        vec![
            Arc::clone(&self.auth),
            Arc::clone(&self.refresh),
            Arc::clone(&self.public),
        ]
    }
}

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: tollgate_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Token issuance, validation and revocation.
    pub sessions: Arc<SessionManager>,
    pub limiters: RateLimiters,
    pub subscription_cache: Arc<SubscriptionCache>,
    pub mailer: Arc<Mailer>,
}

impl AppState {
    /// Wire the session manager to Postgres and build fresh limiters and cache.
    pub fn new(pool: tollgate_db::DbPool, config: ServerConfig, mailer: Mailer) -> Self {
        let store = Arc::new(PgTokenStore::new(pool.clone()));
        let sessions = SessionManager::new(config.auth.codec(), store);

        Self {
            pool,
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            limiters: RateLimiters::default(),
            subscription_cache: Arc::new(SubscriptionCache::default()),
            mailer: Arc::new(mailer),
        }
    }
}
