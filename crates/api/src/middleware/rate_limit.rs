//! Fixed-window rate limiting keyed by the connecting address.
//!
//! Attach with `route_layer(from_fn_with_state(limiter, enforce))`, one
//! limiter per endpoint class. The key is the TCP peer IP only; forwarding
//! headers are client-controlled and ignored here.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tollgate_core::rate_limit::{RateDecision, RateLimiter};

use crate::error::AppError;
use crate::middleware::client::peer_ip;

/// Key used when the server was not started with connect info.
const UNKNOWN_CLIENT: &str = "unknown";

pub async fn enforce(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = peer_ip(request.extensions())
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

    match limiter.check(&key) {
        RateDecision::Allowed => Ok(next.run(request).await),
        RateDecision::Limited { retry_after } => {
            tracing::warn!(
                client = %key,
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            Err(AppError::RateLimited { retry_after })
        }
    }
}
