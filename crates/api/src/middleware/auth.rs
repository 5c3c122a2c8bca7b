//! Access-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tollgate_core::types::UserId;

use crate::auth::cookies::read_access_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from the `access_token` cookie, or from an
/// `Authorization: Bearer` header when no cookie is present.
///
/// Use this as an extractor parameter in any handler that requires authentication:
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    /// Id of the presented access token.
    pub jti: String,
    /// The raw access token, kept so logout can revoke it.
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            read_access_token(&parts.headers).ok_or_else(|| AppError::unauthorized("Unauthorized"))?;

        let claims = state.sessions.authenticate(&token).await?;

        Ok(AuthUser {
            user_id: claims.sub,
            jti: claims.jti,
            token,
        })
    }
}
