//! Handlers for the `/auth` resource (register, login, refresh, logout,
//! password change).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};
use tollgate_core::error::CoreError;
use tollgate_core::session::IssuedSession;
use tollgate_core::types::{Timestamp, UserId};
use tollgate_core::validation::{
    sanitize_input, validate_email, validate_name, validate_password, MAX_EMAIL_LENGTH,
    MAX_NAME_LENGTH,
};
use tollgate_db::models::user::{CreateUser, User, UserResponse};
use tollgate_db::repositories::UserRepo;

use crate::auth::cookies::{
    cleared_cookies, read_cookie, session_cookies, ACCESS_COOKIE, REFRESH_COOKIE,
};
use crate::auth::password::{
    hash_password_blocking, verify_against_dummy, verify_password_blocking,
};
use crate::error::{AppError, AppResult};
use crate::handlers::verification::send_verification_email;
use crate::middleware::auth::AuthUser;
use crate::middleware::client::Client;
use crate::middleware::csrf::require_csrf;
use crate::response::{DataResponse, MessageResponse};
use crate::state::AppState;

/// Returned for both unknown emails and wrong passwords.
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const INVALID_REFRESH_TOKEN: &str = "Invalid refresh token";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Body returned by login and refresh. Tokens travel in cookies only.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// When the access token expires.
    pub access_expires_at: Timestamp,
    /// When the session (refresh token) expires.
    pub expires_at: Timestamp,
}

/// Lower-cased, trimmed email used for storage and lookup.
pub(crate) fn normalize_email(email: &str) -> Result<String, CoreError> {
    Ok(sanitize_input(email, MAX_EMAIL_LENGTH)?.to_lowercase())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account and email a verification link. Does not log in.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    let email = normalize_email(&input.email)?;
    let name = sanitize_input(&input.name, MAX_NAME_LENGTH)?;
    validate_email(&email)?;
    validate_name(&name)?;
    validate_password(&input.password)?;

    if UserRepo::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Core(CoreError::Conflict(
            "Email already registered".into(),
        )));
    }

    let password_hash = hash_password_blocking(input.password).await?;
    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            name,
            password_hash,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, "User registered");

    if let Err(e) = send_verification_email(&state, &user).await {
        tracing::warn!(error = %e, user_id = user.id, "Failed to queue verification email");
    }

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(&user),
        }),
    ))
}

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Sets the session cookies.
pub async fn login(
    State(state): State<AppState>,
    Client(client): Client,
    Json(input): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<AuthResponse>)> {
    let email = normalize_email(&input.email)
        .map_err(|_| AppError::unauthorized(INVALID_CREDENTIALS))?;

    let Some(user) = UserRepo::find_by_email(&state.pool, &email).await? else {
        verify_against_dummy(input.password).await;
        tracing::info!("Login failed: unknown email");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    };

    let valid = verify_password_blocking(input.password, user.password_hash.clone()).await?;
    if !valid {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let session = state.sessions.issue_session(user.id, &client).await?;
    tracing::info!(user_id = user.id, "User logged in");

    auth_response(&state, &user, &session)
}

/// POST /api/v1/auth/refresh
///
/// Exchange the refresh cookie for a new session. Requires the CSRF header.
pub async fn refresh(
    State(state): State<AppState>,
    Client(client): Client,
    headers: HeaderMap,
) -> AppResult<(HeaderMap, Json<AuthResponse>)> {
    let refresh_token = read_cookie(&headers, REFRESH_COOKIE)
        .ok_or_else(|| AppError::unauthorized(INVALID_REFRESH_TOKEN))?;

    require_csrf(&headers)?;

    let session = state
        .sessions
        .refresh(&refresh_token, &client)
        .await
        .map_err(|e| {
            if e.is_internal() {
                AppError::from(e)
            } else {
                tracing::info!(error = %e, "Refresh rejected");
                AppError::unauthorized(INVALID_REFRESH_TOKEN)
            }
        })?;

    // The superseded access token may still be live; retire it.
    if let Some(old_access) = read_cookie(&headers, ACCESS_COOKIE) {
        if let Err(e) = state.sessions.revoke_access_token(&old_access).await {
            tracing::debug!(error = %e, "Previous access token not revoked");
        }
    }

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID_REFRESH_TOKEN))?;

    auth_response(&state, &user, &session)
}

/// POST /api/v1/auth/logout
///
/// Revoke the presented access token and every refresh token of the user,
/// then clear the cookies. Revocation failures are logged, not returned.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<(HeaderMap, Json<MessageResponse>)> {
    if let Err(e) = state.sessions.revoke_access_token(&auth_user.token).await {
        tracing::error!(error = %e, user_id = auth_user.user_id, "Failed to blacklist access token");
    }
    if let Err(e) = state.sessions.revoke_all_sessions(auth_user.user_id).await {
        tracing::error!(error = %e, user_id = auth_user.user_id, "Failed to revoke refresh tokens");
    }
    state.subscription_cache.invalidate(auth_user.user_id).await;

    tracing::info!(user_id = auth_user.user_id, "User logged out");
    Ok((
        cleared_cookies(state.config.auth.cookie_secure),
        Json(MessageResponse::new("Successfully logged out")),
    ))
}

/// POST /api/v1/auth/account-password
///
/// Change the password of the logged-in user and revoke their other sessions.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    validate_password(&input.new_password)?;

    let user = find_user(&state, auth_user.user_id).await?;
    let valid = verify_password_blocking(input.current_password, user.password_hash).await?;
    if !valid {
        return Err(AppError::unauthorized("Current password is incorrect"));
    }

    let password_hash = hash_password_blocking(input.new_password).await?;
    UserRepo::update_password(&state.pool, user.id, &password_hash).await?;
    tracing::info!(user_id = user.id, "Password changed");

    revoke_sessions_best_effort(&state, user.id).await;

    Ok(Json(MessageResponse::new("Password updated successfully")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn auth_response(
    state: &AppState,
    user: &User,
    session: &IssuedSession,
) -> AppResult<(HeaderMap, Json<AuthResponse>)> {
    let headers = session_cookies(session, state.config.auth.cookie_secure)?;
    Ok((
        headers,
        Json(AuthResponse {
            user: UserResponse::from(user),
            access_expires_at: session.access_expires_at,
            expires_at: session.expires_at,
        }),
    ))
}

pub(crate) async fn find_user(state: &AppState, user_id: UserId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "User",
                id: user_id,
            })
        })
}

/// Block every refresh token of `user_id`, logging instead of failing.
pub(crate) async fn revoke_sessions_best_effort(state: &AppState, user_id: UserId) {
    if let Err(e) = state.sessions.revoke_all_sessions(user_id).await {
        tracing::error!(error = %e, user_id, "Failed to revoke sessions");
    }
}
