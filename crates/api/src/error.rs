use std::time::Duration;

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use tollgate_core::csrf::CsrfError;
use tollgate_core::error::CoreError;
use tollgate_core::one_time::OneTimeTokenError;
use tollgate_core::session::SessionError;
use tollgate_core::webhook::WebhookError;
use tollgate_db::RedeemError;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `tollgate_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// The CSRF header did not match the CSRF cookie.
    #[error(transparent)]
    Csrf(#[from] CsrfError),

    /// The client exceeded its request budget.
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// A downstream lookup did not finish in time.
    #[error("Timed out: {0}")]
    Timeout(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn unauthorized(message: &str) -> Self {
        AppError::Core(CoreError::Unauthorized(message.to_string()))
    }
}

/// Token and session failures collapse to a generic 401 so the response never
/// says which check failed. Storage failures surface as 500.
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        if err.is_internal() {
            AppError::InternalError(err.to_string())
        } else {
            tracing::debug!(error = %err, "Session rejected");
            AppError::unauthorized("Unauthorized")
        }
    }
}

impl From<RedeemError> for AppError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::Database(e) => AppError::Database(e),
            RedeemError::Token(OneTimeTokenError::NotFound) => {
                AppError::BadRequest("Invalid or expired token".into())
            }
            RedeemError::Token(OneTimeTokenError::AlreadyUsed) => {
                AppError::BadRequest("Token has already been used".into())
            }
            RedeemError::Token(OneTimeTokenError::Expired) => {
                AppError::BadRequest("Token has expired".into())
            }
        }
    }
}

/// Malformed or incomplete webhook events are the sender's fault.
impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Csrf(_) => (
                StatusCode::FORBIDDEN,
                "CSRF_MISMATCH",
                "Invalid CSRF token".to_string(),
            ),
            AppError::RateLimited { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "Too many requests".to_string(),
            ),
            AppError::Timeout(msg) => {
                tracing::warn!(what = %msg, "Request timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    "Request timeout".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let AppError::RateLimited { retry_after } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_date(*retry_after)) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}

/// HTTP-date (RFC 7231 IMF-fixdate) `retry_after` from now.
fn retry_after_date(retry_after: Duration) -> String {
    let delta = chrono::Duration::from_std(retry_after).unwrap_or(chrono::Duration::zero());
    (Utc::now() + delta)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use tollgate_core::token::TokenError;

    use super::*;

    #[test]
    fn session_rejections_are_generic() {
        let a: AppError = SessionError::Blacklisted.into();
        let b: AppError = SessionError::Token(TokenError::Expired).into();
        assert_eq!(a.into_response().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(b.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response = AppError::RateLimited {
            retry_after: Duration::from_secs(60),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let value = response.headers().get(RETRY_AFTER).unwrap().to_str().unwrap();
        assert!(value.ends_with(" GMT"));
    }

    #[test]
    fn csrf_mismatch_is_forbidden() {
        let response = AppError::from(CsrfError::Mismatch).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
