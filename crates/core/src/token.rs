//! Signed session tokens (HS256 JWTs).
//!
//! Two token kinds share one claim layout and differ only in the `type`
//! discriminator, the signing key and the lifetime. Access and refresh keys
//! are configured independently so either can be rotated on its own; they
//! may also be the same secret, in which case the discriminator alone keeps
//! a refresh token from being accepted where an access token is expected.
//!
//! Expiry is checked against an explicit `now` with no leeway, so every
//! `*_at` operation is deterministic.

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Timestamp, UserId};

/// Access token lifetime: 5 minutes.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 5 * 60;
/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// Discriminates access tokens from refresh tokens (the `type` claim).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject -- the user's database id.
    pub sub: UserId,
    /// Expiration time (UTC Unix seconds).
    pub exp: i64,
    /// Issued-at time (UTC Unix seconds).
    pub iat: i64,
    /// Unique token id (UUID v4). Blacklist and refresh-row key.
    pub jti: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

impl Claims {
    /// Expiry as a timestamp. Out-of-range values saturate to the far future.
    pub fn expires_at(&self) -> Timestamp {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

// ---------------------------------------------------------------------------
// Errors and policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("expected a {expected} token, got a {found} token")]
    WrongType { expected: TokenKind, found: TokenKind },

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    fn from_jwt(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

/// Token lifetimes. Production always runs with [`TokenPolicy::default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl_secs: ACCESS_TOKEN_TTL_SECS,
            refresh_ttl_secs: REFRESH_TOKEN_TTL_SECS,
        }
    }
}

impl TokenPolicy {
    pub fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Signs and verifies access and refresh tokens.
#[derive(Clone)]
pub struct TokenCodec {
    access: KeyPair,
    refresh: KeyPair,
    policy: TokenPolicy,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec with distinct access and refresh secrets.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `decode_at` against the caller's clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        // jsonwebtoken only recognizes string subjects; `sub` is numeric here
        // and its presence is enforced by deserializing into `Claims`.
        validation.set_required_spec_claims(&["exp"]);

        Self {
            access: KeyPair::from_secret(access_secret),
            refresh: KeyPair::from_secret(refresh_secret),
            policy: TokenPolicy::default(),
            validation,
        }
    }

    /// Build a codec that signs both kinds with one secret.
    pub fn shared(secret: &[u8]) -> Self {
        Self::new(secret, secret)
    }

    pub fn with_policy(mut self, policy: TokenPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Sign arbitrary claims with the key matching `claims.kind`.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(claims.kind).encoding,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Issue a new token of `kind` for `subject`, valid from now.
    pub fn issue(&self, kind: TokenKind, subject: UserId) -> Result<IssuedToken, TokenError> {
        self.issue_at(kind, subject, Utc::now())
    }

    /// Issue a new token of `kind` for `subject` with a fresh `jti`.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        subject: UserId,
        now: Timestamp,
    ) -> Result<IssuedToken, TokenError> {
        let iat = now.timestamp();
        let claims = Claims {
            sub: subject,
            exp: iat + self.policy.ttl_secs(kind),
            iat,
            jti: Uuid::new_v4().to_string(),
            kind,
        };
        let token = self.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    pub fn decode(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        self.decode_at(token, expected, Utc::now())
    }

    /// Verify `token` as a token of kind `expected` at instant `now`.
    ///
    /// A token is expired once `now` reaches `exp`.
    pub fn decode_at(
        &self,
        token: &str,
        expected: TokenKind,
        now: Timestamp,
    ) -> Result<Claims, TokenError> {
        let data =
            jsonwebtoken::decode::<Claims>(token, &self.keys(expected).decoding, &self.validation)
                .map_err(TokenError::from_jwt)?;
        let claims = data.claims;

        if claims.kind != expected {
            return Err(TokenError::WrongType {
                expected,
                found: claims.kind,
            });
        }
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone};

    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"access-secret-for-tests", b"refresh-secret-for-tests")
    }

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_issue_then_decode_returns_same_claims() {
        let codec = codec();
        let issued = codec.issue_at(TokenKind::Access, 42, t0()).unwrap();

        let claims = codec
            .decode_at(&issued.token, TokenKind::Access, t0())
            .unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iat, t0().timestamp());
        assert_eq!(claims.exp, t0().timestamp() + ACCESS_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_refresh_token_lives_seven_days() {
        let issued = codec().issue_at(TokenKind::Refresh, 7, t0()).unwrap();
        assert_eq!(issued.claims.exp - issued.claims.iat, REFRESH_TOKEN_TTL_SECS);
        assert_eq!(issued.claims.expires_at(), t0() + Duration::days(7));
    }

    #[test]
    fn test_each_issue_has_unique_jti() {
        let codec = codec();
        let a = codec.issue_at(TokenKind::Access, 1, t0()).unwrap();
        let b = codec.issue_at(TokenKind::Access, 1, t0()).unwrap();
        assert_ne!(a.claims.jti, b.claims.jti);
    }

    #[test]
    fn test_expired_at_exact_boundary() {
        let codec = codec();
        let issued = codec.issue_at(TokenKind::Access, 1, t0()).unwrap();

        let just_before = t0() + Duration::seconds(ACCESS_TOKEN_TTL_SECS - 1);
        assert!(codec
            .decode_at(&issued.token, TokenKind::Access, just_before)
            .is_ok());

        let at_expiry = t0() + Duration::seconds(ACCESS_TOKEN_TTL_SECS);
        assert_matches!(
            codec.decode_at(&issued.token, TokenKind::Access, at_expiry),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_refresh_token_rejected_as_access_with_shared_secret() {
        let codec = TokenCodec::shared(b"one-secret-for-both");
        let refresh = codec.issue_at(TokenKind::Refresh, 1, t0()).unwrap();

        assert_matches!(
            codec.decode_at(&refresh.token, TokenKind::Access, t0()),
            Err(TokenError::WrongType {
                expected: TokenKind::Access,
                found: TokenKind::Refresh,
            })
        );
    }

    #[test]
    fn test_refresh_token_rejected_as_access_with_split_secrets() {
        let codec = codec();
        let refresh = codec.issue_at(TokenKind::Refresh, 1, t0()).unwrap();

        assert_matches!(
            codec.decode_at(&refresh.token, TokenKind::Access, t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_different_secrets_fail() {
        let issued = codec().issue_at(TokenKind::Access, 1, t0()).unwrap();
        let other = TokenCodec::shared(b"some-other-secret");

        assert_matches!(
            other.decode_at(&issued.token, TokenKind::Access, t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_garbage_is_malformed() {
        let codec = codec();
        assert_matches!(
            codec.decode_at("not-a-token", TokenKind::Access, t0()),
            Err(TokenError::Malformed)
        );
        assert_matches!(
            codec.decode_at("", TokenKind::Access, t0()),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_missing_type_claim_is_malformed() {
        #[derive(Serialize)]
        struct Untyped {
            sub: i64,
            exp: i64,
            iat: i64,
            jti: String,
        }

        let untyped = Untyped {
            sub: 1,
            exp: t0().timestamp() + 60,
            iat: t0().timestamp(),
            jti: "abc".to_string(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &untyped,
            &EncodingKey::from_secret(b"access-secret-for-tests"),
        )
        .unwrap();

        assert_matches!(
            codec().decode_at(&token, TokenKind::Access, t0()),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_numeric_subject_survives_decode() {
        let codec = codec();
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            let issued = codec.issue_at(kind, 42, t0()).unwrap();
            let claims = codec.decode_at(&issued.token, kind, t0()).unwrap();
            assert_eq!(claims.sub, 42);
        }
    }

    #[test]
    fn test_missing_subject_is_malformed() {
        #[derive(Serialize)]
        struct Anonymous {
            exp: i64,
            iat: i64,
            jti: String,
            #[serde(rename = "type")]
            kind: TokenKind,
        }

        let anonymous = Anonymous {
            exp: t0().timestamp() + 60,
            iat: t0().timestamp(),
            jti: "abc".to_string(),
            kind: TokenKind::Access,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &anonymous,
            &EncodingKey::from_secret(b"access-secret-for-tests"),
        )
        .unwrap();

        assert_matches!(
            codec().decode_at(&token, TokenKind::Access, t0()),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn test_tampered_payload_fails_signature() {
        let codec = codec();
        let issued = codec.issue_at(TokenKind::Access, 1, t0()).unwrap();
        let forged = codec
            .issue_at(TokenKind::Access, 999, t0())
            .unwrap()
            .token;

        // Splice the forged payload onto the original signature.
        let orig: Vec<&str> = issued.token.split('.').collect();
        let fake: Vec<&str> = forged.split('.').collect();
        let spliced = format!("{}.{}.{}", orig[0], fake[1], orig[2]);

        assert_matches!(
            codec.decode_at(&spliced, TokenKind::Access, t0()),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn test_custom_policy_shortens_lifetimes() {
        let codec = codec().with_policy(TokenPolicy {
            access_ttl_secs: 2,
            refresh_ttl_secs: 10,
        });
        let issued = codec.issue_at(TokenKind::Access, 1, t0()).unwrap();
        assert_eq!(issued.claims.exp, t0().timestamp() + 2);
    }

    #[test]
    fn test_type_claim_serializes_lowercase() {
        let issued = codec().issue_at(TokenKind::Refresh, 1, t0()).unwrap();
        let json = serde_json::to_value(&issued.claims).unwrap();
        assert_eq!(json["type"], "refresh");
    }
}
