//! Double-submit CSRF check for cookie-authenticated state changes.

use axum::http::HeaderMap;
use tollgate_core::csrf::{verify_csrf, CsrfError};

use crate::auth::cookies::{read_cookie, CSRF_COOKIE, CSRF_HEADER};

/// Require the `X-CSRF-Token` header to equal the `csrf_token` cookie.
pub fn require_csrf(headers: &HeaderMap) -> Result<(), CsrfError> {
    let header = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    let cookie = read_cookie(headers, CSRF_COOKIE);
    verify_csrf(header, cookie.as_deref())
}

#[cfg(test)]
mod tests {
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn header_must_echo_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("csrf_token=abc123"));
        assert_eq!(require_csrf(&headers), Err(CsrfError::Mismatch));

        headers.insert(CSRF_HEADER, HeaderValue::from_static("abc124"));
        assert_eq!(require_csrf(&headers), Err(CsrfError::Mismatch));

        headers.insert(CSRF_HEADER, HeaderValue::from_static("abc123"));
        assert_eq!(require_csrf(&headers), Ok(()));
    }
}
