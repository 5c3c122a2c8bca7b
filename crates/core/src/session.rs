//! Session lifecycle: issue, authenticate, refresh and revoke.
//!
//! A session is an access/refresh token pair plus a CSRF token. The access
//! token is stateless except for the blacklist; the refresh token is backed by
//! a stored row that can be blocked. Refreshing issues a brand-new pair and
//! leaves the presented refresh row usable until it expires or is blocked.

use std::sync::Arc;

use chrono::Utc;

use crate::csrf::generate_csrf_token;
use crate::hashing::refresh_token_hash;
use crate::store::{NewRefreshToken, StoreError, TokenStore};
use crate::token::{Claims, TokenCodec, TokenError, TokenKind};
use crate::types::{Timestamp, UserId};

/// Stored in place of a missing `User-Agent`.
pub const UNKNOWN_DEVICE: &str = "Unknown Device";
/// Stored in place of a missing client address.
pub const UNKNOWN_ORIGIN: &str = "0.0.0.0";

/// Where a session was started from.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub device: Option<String>,
    pub origin: Option<String>,
}

impl ClientInfo {
    fn device_or_default(&self) -> String {
        non_empty(self.device.as_deref()).unwrap_or(UNKNOWN_DEVICE).to_string()
    }

    fn origin_or_default(&self) -> String {
        non_empty(self.origin.as_deref()).unwrap_or(UNKNOWN_ORIGIN).to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Everything the transport needs to hand a new session to the client.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub user_id: UserId,
    pub access_token: String,
    pub access_jti: String,
    pub access_expires_at: Timestamp,
    pub refresh_token: String,
    pub csrf_token: String,
    /// Refresh-token expiry; all session cookies share it.
    pub expires_at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token has been revoked")]
    Blacklisted,

    #[error("refresh token not found")]
    RefreshNotFound,

    #[error("refresh token is blocked")]
    RefreshBlocked,

    #[error("refresh token has expired")]
    RefreshExpired,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SessionError {
    /// True for failures of the server rather than of the presented credential.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SessionError::Store(_) | SessionError::Token(TokenError::Signing(_))
        )
    }
}

#[derive(Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(codec: TokenCodec, store: Arc<dyn TokenStore>) -> Self {
        Self { codec, store }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    // -----------------------------------------------------------------------
    // Issue
    // -----------------------------------------------------------------------

    pub async fn issue_session(
        &self,
        user_id: UserId,
        client: &ClientInfo,
    ) -> Result<IssuedSession, SessionError> {
        self.issue_session_at(user_id, client, Utc::now()).await
    }

    /// Issue a new token pair and persist the refresh row.
    pub async fn issue_session_at(
        &self,
        user_id: UserId,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<IssuedSession, SessionError> {
        let access = self.codec.issue_at(TokenKind::Access, user_id, now)?;
        let refresh = self.codec.issue_at(TokenKind::Refresh, user_id, now)?;
        let expires_at = refresh.claims.expires_at();

        self.store
            .create_refresh_token(NewRefreshToken {
                user_id,
                token_hash: refresh_token_hash(&refresh.claims.jti),
                device_info: client.device_or_default(),
                ip_address: client.origin_or_default(),
                expires_at,
            })
            .await?;

        tracing::debug!(user_id, access_jti = %access.claims.jti, "Session issued");

        Ok(IssuedSession {
            user_id,
            access_expires_at: access.claims.expires_at(),
            access_jti: access.claims.jti,
            access_token: access.token,
            refresh_token: refresh.token,
            csrf_token: generate_csrf_token(),
            expires_at,
        })
    }

    // -----------------------------------------------------------------------
    // Authenticate
    // -----------------------------------------------------------------------

    pub async fn authenticate(&self, access_token: &str) -> Result<Claims, SessionError> {
        self.authenticate_at(access_token, Utc::now()).await
    }

    /// Verify an access token and reject revoked ids. Never writes.
    pub async fn authenticate_at(
        &self,
        access_token: &str,
        now: Timestamp,
    ) -> Result<Claims, SessionError> {
        let claims = self.codec.decode_at(access_token, TokenKind::Access, now)?;
        if self.store.is_blacklisted(&claims.jti).await? {
            return Err(SessionError::Blacklisted);
        }
        Ok(claims)
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    pub async fn refresh(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
    ) -> Result<IssuedSession, SessionError> {
        self.refresh_at(refresh_token, client, Utc::now()).await
    }

    /// Exchange a valid refresh token for a brand-new session.
    ///
    /// The presented refresh row is not blocked; it stays usable until it
    /// expires or [`revoke_all_sessions`](Self::revoke_all_sessions) runs.
    pub async fn refresh_at(
        &self,
        refresh_token: &str,
        client: &ClientInfo,
        now: Timestamp,
    ) -> Result<IssuedSession, SessionError> {
        let claims = self
            .codec
            .decode_at(refresh_token, TokenKind::Refresh, now)?;
        let token_hash = refresh_token_hash(&claims.jti);

        let record = self
            .store
            .get_refresh_token(&token_hash)
            .await?
            .ok_or(SessionError::RefreshNotFound)?;

        if record.is_blocked {
            tracing::warn!(user_id = record.user_id, "Blocked refresh token presented");
            return Err(SessionError::RefreshBlocked);
        }
        if record.expires_at <= now {
            return Err(SessionError::RefreshExpired);
        }
        if record.user_id != claims.sub {
            tracing::warn!(
                user_id = record.user_id,
                claimed = claims.sub,
                "Refresh token subject does not match stored row"
            );
            return Err(SessionError::RefreshNotFound);
        }

        if let Err(e) = self.store.touch_refresh_token(&token_hash).await {
            tracing::warn!(error = %e, user_id = record.user_id, "Failed to record refresh token use");
        }

        self.issue_session_at(record.user_id, client, now).await
    }

    // -----------------------------------------------------------------------
    // Revoke
    // -----------------------------------------------------------------------

    pub async fn revoke_access_token(&self, access_token: &str) -> Result<(), SessionError> {
        self.revoke_access_token_at(access_token, Utc::now()).await
    }

    /// Blacklist the token's id until the token's own expiry.
    ///
    /// Fails if the token itself does not verify at `now`.
    pub async fn revoke_access_token_at(
        &self,
        access_token: &str,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        let claims = self.codec.decode_at(access_token, TokenKind::Access, now)?;
        self.store
            .add_to_blacklist(&claims.jti, claims.sub, claims.expires_at())
            .await?;
        tracing::debug!(user_id = claims.sub, jti = %claims.jti, "Access token revoked");
        Ok(())
    }

    /// Block every refresh row of `user_id`.
    ///
    /// Access tokens already issued stay valid until they expire unless they
    /// are revoked individually.
    pub async fn revoke_all_sessions(&self, user_id: UserId) -> Result<u64, SessionError> {
        let blocked = self.store.block_all_refresh_tokens(user_id).await?;
        tracing::info!(user_id, blocked, "All sessions revoked");
        Ok(blocked)
    }
}
