//! Session cookie transport.
//!
//! A session travels as three cookies sharing the refresh token's expiry:
//!
//! | Cookie          | Path                     | HttpOnly |
//! |-----------------|--------------------------|----------|
//! | `access_token`  | `/`                      | yes      |
//! | `refresh_token` | `/api/v1/auth/refresh`   | yes      |
//! | `csrf_token`    | `/`                      | no       |
//!
//! All are `SameSite=Strict` and `Secure` unless `COOKIE_SECURE=false`.

use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use tollgate_core::session::IssuedSession;
use tollgate_core::types::Timestamp;

use crate::error::{AppError, AppResult};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";
pub const CSRF_COOKIE: &str = "csrf_token";
/// Header that must echo the `csrf_token` cookie.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The refresh cookie is only sent to the refresh endpoint.
pub const REFRESH_COOKIE_PATH: &str = "/api/v1/auth/refresh";

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

struct CookieSpec {
    name: &'static str,
    path: &'static str,
    http_only: bool,
}

const ACCESS: CookieSpec = CookieSpec {
    name: ACCESS_COOKIE,
    path: "/",
    http_only: true,
};
const REFRESH: CookieSpec = CookieSpec {
    name: REFRESH_COOKIE,
    path: REFRESH_COOKIE_PATH,
    http_only: true,
};
const CSRF: CookieSpec = CookieSpec {
    name: CSRF_COOKIE,
    path: "/",
    http_only: false,
};

fn http_date(at: Timestamp) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn build_cookie(spec: &CookieSpec, value: &str, expires: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={value}; Path={}; Expires={expires}; SameSite=Strict",
        spec.name, spec.path
    );
    if spec.http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn append_cookie(headers: &mut HeaderMap, cookie: String) -> AppResult<()> {
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::InternalError(format!("Invalid cookie value: {e}")))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// `Set-Cookie` headers handing `session` to the browser.
pub fn session_cookies(session: &IssuedSession, secure: bool) -> AppResult<HeaderMap> {
    let expires = http_date(session.expires_at);
    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        build_cookie(&ACCESS, &session.access_token, &expires, secure),
    )?;
    append_cookie(
        &mut headers,
        build_cookie(&REFRESH, &session.refresh_token, &expires, secure),
    )?;
    append_cookie(
        &mut headers,
        build_cookie(&CSRF, &session.csrf_token, &expires, secure),
    )?;
    Ok(headers)
}

/// `Set-Cookie` headers that delete all session cookies.
pub fn cleared_cookies(secure: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for spec in [&ACCESS, &REFRESH, &CSRF] {
        let mut cookie = build_cookie(spec, "", EXPIRED, secure);
        cookie.push_str("; Max-Age=0");
        // Static names and paths only, so this cannot fail.
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(SET_COOKIE, value);
        }
    }
    headers
}

/// Read a cookie value from the request's `Cookie` headers.
///
/// Empty values are treated as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
        .find(|value| !value.is_empty())
}

/// Read a `Bearer` token from the `Authorization` header.
pub fn read_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// The access token presented by the client: cookie first, then bearer.
pub fn read_access_token(headers: &HeaderMap) -> Option<String> {
    read_cookie(headers, ACCESS_COOKIE).or_else(|| read_bearer(headers))
}
