//! Handlers for the `/user` resource (profile, subscription status).

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tollgate_core::error::CoreError;
use tollgate_core::validation::{
    sanitize_input, validate_email, validate_name, MAX_NAME_LENGTH,
};
use tollgate_db::models::user::{SubscriptionStatus, UpdateProfile, UserResponse};
use tollgate_db::repositories::UserRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::{find_user, normalize_email};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;
use crate::subscription_cache::SUBSCRIPTION_LOOKUP_TIMEOUT;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// GET /api/v1/user/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = find_user(&state, auth_user.user_id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// PUT /api/v1/user/profile
///
/// Changing the email clears its verified flag.
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<UpdateProfileRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let name = input
        .name
        .map(|n| sanitize_input(&n, MAX_NAME_LENGTH))
        .transpose()?;
    let email = input.email.map(|e| normalize_email(&e)).transpose()?;
    if let Some(name) = &name {
        validate_name(name)?;
    }
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let user = UserRepo::update_profile(&state.pool, auth_user.user_id, &UpdateProfile { name, email })
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                id: auth_user.user_id,
            })
        })?;

    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// GET /api/v1/user/subscription-status
///
/// Served from cache when fresh. On a miss the lookup runs as a detached
/// task: if it outlives the timeout the caller gets 504, but the task still
/// completes and fills the cache for the next request.
pub async fn subscription_status(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<SubscriptionStatus>>> {
    let user_id = auth_user.user_id;

    if let Some(status) = state.subscription_cache.get(user_id).await {
        return Ok(Json(DataResponse { data: status }));
    }

    let pool = state.pool.clone();
    let cache = state.subscription_cache.clone();
    let lookup = tokio::spawn(async move {
        let status = UserRepo::subscription_status(&pool, user_id).await?;
        if let Some(status) = &status {
            cache.put(user_id, status.clone()).await;
        }
        Ok::<_, sqlx::Error>(status)
    });

    let status = tokio::time::timeout(SUBSCRIPTION_LOOKUP_TIMEOUT, lookup)
        .await
        .map_err(|_| AppError::Timeout("subscription status lookup".into()))?
        .map_err(|e| AppError::InternalError(format!("Subscription lookup task failed: {e}")))??
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })
        })?;

    Ok(Json(DataResponse { data: status }))
}
