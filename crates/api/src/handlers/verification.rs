//! Handlers for email verification.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tollgate_core::one_time::{
    expires_at, generate_one_time_token, is_well_formed, EMAIL_VERIFICATION_TTL_SECS,
};
use tollgate_db::models::user::User;
use tollgate_db::repositories::EmailVerificationRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::auth::find_user;
use crate::middleware::auth::AuthUser;
use crate::response::MessageResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Store a fresh verification token for `user` and mail it in the background.
pub(crate) async fn send_verification_email(
    state: &AppState,
    user: &User,
) -> Result<(), sqlx::Error> {
    let token = generate_one_time_token();
    let expiry = expires_at(Utc::now(), EMAIL_VERIFICATION_TTL_SECS);
    EmailVerificationRepo::create(&state.pool, user.id, &user.email, &token, expiry).await?;

    let mailer = state.mailer.clone();
    let (user_id, email) = (user.id, user.email.clone());
    tokio::spawn(async move {
        if let Err(e) = mailer.send_verification(&email, &token).await {
            tracing::error!(error = %e, user_id, "Verification email failed");
        }
    });
    Ok(())
}

/// POST /api/v1/auth/verify-email/send
pub async fn send(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<MessageResponse>> {
    let user = find_user(&state, auth_user.user_id).await?;
    if user.email_verified {
        return Ok(Json(MessageResponse::new("Email already verified")));
    }

    send_verification_email(&state, &user).await?;
    Ok(Json(MessageResponse::new("Verification email sent")))
}

/// POST /api/v1/auth/verify-email
pub async fn verify(
    State(state): State<AppState>,
    Json(input): Json<VerifyEmailRequest>,
) -> AppResult<Json<MessageResponse>> {
    if !is_well_formed(&input.token) {
        return Err(AppError::BadRequest("Invalid or expired token".into()));
    }

    let user_id = EmailVerificationRepo::redeem(&state.pool, &input.token, Utc::now()).await?;
    tracing::info!(user_id, "Email verified");

    Ok(Json(MessageResponse::new("Email verified successfully")))
}
