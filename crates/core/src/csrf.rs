//! Double-submit CSRF tokens.
//!
//! The token is handed to the browser in a script-readable cookie and must be
//! echoed back in a request header. Nothing is stored server-side.

use rand::Rng;

/// Length of a generated CSRF token (alphanumeric characters).
pub const CSRF_TOKEN_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CsrfError {
    #[error("CSRF token mismatch")]
    Mismatch,
}

/// Generate a fresh random CSRF token.
pub fn generate_csrf_token() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(CSRF_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Check the header value against the cookie value.
///
/// Passes only when both are present, non-empty and byte-for-byte equal.
pub fn verify_csrf(header: Option<&str>, cookie: Option<&str>) -> Result<(), CsrfError> {
    match (header, cookie) {
        (Some(h), Some(c)) if !h.is_empty() && h == c => Ok(()),
        _ => Err(CsrfError::Mismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_alphanumeric_and_distinct() {
        let a = generate_csrf_token();
        let b = generate_csrf_token();
        assert_eq!(a.len(), CSRF_TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn matching_pair_passes() {
        assert_eq!(verify_csrf(Some("abc123"), Some("abc123")), Ok(()));
    }

    #[test]
    fn missing_or_empty_side_fails() {
        assert_eq!(verify_csrf(None, Some("abc")), Err(CsrfError::Mismatch));
        assert_eq!(verify_csrf(Some("abc"), None), Err(CsrfError::Mismatch));
        assert_eq!(verify_csrf(None, None), Err(CsrfError::Mismatch));
        assert_eq!(verify_csrf(Some(""), Some("")), Err(CsrfError::Mismatch));
    }

    #[test]
    fn comparison_is_exact() {
        assert_eq!(verify_csrf(Some("abc"), Some("ABC")), Err(CsrfError::Mismatch));
        assert_eq!(verify_csrf(Some("abc "), Some("abc")), Err(CsrfError::Mismatch));
    }
}
