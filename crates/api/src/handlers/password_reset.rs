//! Handlers for password reset by emailed one-time token.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tollgate_core::one_time::{
    expires_at, generate_one_time_token, is_well_formed, PASSWORD_RESET_TTL_SECS,
};
use tollgate_core::validation::validate_password;
use tollgate_db::repositories::{PasswordResetRepo, UserRepo};

use crate::auth::password::hash_password_blocking;
use crate::error::{AppError, AppResult};
use crate::handlers::auth::{normalize_email, revoke_sessions_best_effort};
use crate::response::MessageResponse;
use crate::state::AppState;

/// Identical for known and unknown addresses.
const RESET_REQUESTED: &str =
    "If an account exists for that email, a password reset link has been sent";

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// POST /api/v1/auth/reset-password/request
///
/// Always answers with the same message so the response does not reveal
/// whether the email is registered.
pub async fn request_reset(
    State(state): State<AppState>,
    Json(input): Json<ResetRequest>,
) -> AppResult<Json<MessageResponse>> {
    let Ok(email) = normalize_email(&input.email) else {
        tracing::debug!("Password reset requested for an over-long email");
        return Ok(Json(MessageResponse::new(RESET_REQUESTED)));
    };

    match UserRepo::find_by_email(&state.pool, &email).await {
        Ok(Some(user)) => {
            let token = generate_one_time_token();
            let expiry = expires_at(Utc::now(), PASSWORD_RESET_TTL_SECS);
            match PasswordResetRepo::create(&state.pool, user.id, &token, expiry).await {
                Ok(_) => {
                    tracing::info!(user_id = user.id, "Password reset requested");
                    let mailer = state.mailer.clone();
                    tokio::spawn(async move {
                        if let Err(e) = mailer.send_password_reset(&user.email, &token).await {
                            tracing::error!(error = %e, user_id = user.id, "Password reset email failed");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, user_id = user.id, "Failed to store reset token");
                }
            }
        }
        Ok(None) => tracing::debug!("Password reset requested for unknown email"),
        Err(e) => tracing::error!(error = %e, "Password reset lookup failed"),
    }

    Ok(Json(MessageResponse::new(RESET_REQUESTED)))
}

/// POST /api/v1/auth/reset-password
///
/// Redeem a reset token, set the new password and revoke every session.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if !is_well_formed(&input.token) {
        return Err(AppError::BadRequest("Invalid or expired token".into()));
    }
    validate_password(&input.new_password)?;

    let password_hash = hash_password_blocking(input.new_password).await?;
    let user_id =
        PasswordResetRepo::redeem(&state.pool, &input.token, &password_hash, Utc::now()).await?;
    tracing::info!(user_id, "Password reset completed");

    revoke_sessions_best_effort(&state, user_id).await;

    Ok(Json(MessageResponse::new("Password has been reset")))
}
