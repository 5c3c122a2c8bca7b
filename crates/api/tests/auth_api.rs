//! HTTP-level integration tests for login, refresh, logout, CSRF and rate
//! limiting.

mod common;

use std::time::Duration;

use axum::http::header::RETRY_AFTER;
use axum::http::StatusCode;
use common::{body_json, create_test_user, set_cookie_headers, Cookies, TEST_PASSWORD};
use serde_json::json;
use sqlx::PgPool;
use tollgate_core::token::TokenPolicy;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_creates_unverified_user(pool: PgPool) {
    let app = common::build_test_app(pool.clone());

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "  New.User@Example.com ", "name": "New User", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    // Registration does not log in.
    assert!(set_cookie_headers(&response).is_empty());

    let json = body_json(response).await;
    assert_eq!(json["data"]["email"], "new.user@example.com");
    assert_eq!(json["data"]["email_verified"], false);
    assert!(json["data"].get("password_hash").is_none());

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM email_verification_tokens WHERE email = 'new.user@example.com'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(pending, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_duplicate_email_conflicts(pool: PgPool) {
    create_test_user(&pool, "taken@example.com").await;
    let app = common::build_test_app(pool);

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "TAKEN@example.com", "name": "Other", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_weak_password(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "weak@example.com", "name": "Weak", "password": "password" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn register_rejects_over_long_name_and_email(pool: PgPool) {
    let app = common::build_test_app(pool.clone());

    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": "long@example.com", "name": "a".repeat(101), "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let email = format!("{}@example.com", "a".repeat(250));
    let response = app
        .post_json(
            "/api/v1/auth/register",
            json!({ "email": email, "name": "Long Email", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_sets_session_cookies(pool: PgPool) {
    let user = create_test_user(&pool, "login@example.com").await;
    let app = common::build_test_app(pool);

    let response = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "login@example.com", "password": TEST_PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = set_cookie_headers(&response);
    assert_eq!(headers.len(), 3);
    let access = headers.iter().find(|h| h.starts_with("access_token=")).unwrap();
    let refresh = headers.iter().find(|h| h.starts_with("refresh_token=")).unwrap();
    let csrf = headers.iter().find(|h| h.starts_with("csrf_token=")).unwrap();
    assert!(access.contains("HttpOnly") && access.contains("Path=/;"));
    assert!(refresh.contains("HttpOnly") && refresh.contains("Path=/api/v1/auth/refresh"));
    assert!(!csrf.contains("HttpOnly"));
    assert!(headers.iter().all(|h| h.contains("SameSite=Strict")));
    // Test config turns off the Secure flag.
    assert!(headers.iter().all(|h| !h.contains("Secure")));

    let cookies = Cookies::from_response(&response);
    assert_eq!(cookies.get("csrf_token").unwrap().len(), 32);

    let json = body_json(response).await;
    assert_eq!(json["user"]["id"], user.id);
    assert!(json["expires_at"].is_string());
    assert!(json["access_expires_at"].is_string());
    assert!(json.get("access_token").is_none(), "tokens travel in cookies only");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_failures_are_indistinguishable(pool: PgPool) {
    create_test_user(&pool, "known@example.com").await;
    let app = common::build_test_app(pool);

    let wrong_password = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "known@example.com", "password": "Wr0ng!Password" }),
        )
        .await;
    let unknown_email = app
        .post_json(
            "/api/v1/auth/login",
            json!({ "email": "ghost@example.com", "password": TEST_PASSWORD }),
        )
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(wrong_password).await, body_json(unknown_email).await);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sixth_login_attempt_is_rate_limited(pool: PgPool) {
    let app = common::build_test_app(pool);
    let body = json!({ "email": "ghost@example.com", "password": TEST_PASSWORD });

    for _ in 0..5 {
        let response = app.post_json("/api/v1/auth/login", body.clone()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = app.post_json("/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().get(RETRY_AFTER).is_some());
    assert_eq!(body_json(response).await["code"], "RATE_LIMITED");

    // Limiter classes do not share counters.
    let response = app
        .post_json("/api/v1/auth/verify-email", json!({ "token": "bogus" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Authenticated access
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_accepts_cookie_or_bearer(pool: PgPool) {
    create_test_user(&pool, "me@example.com").await;
    let app = common::build_test_app(pool);

    let response = app.get("/api/v1/user/me", &Cookies::default()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Unauthorized");

    let cookies = app.login("me@example.com", TEST_PASSWORD).await;
    let response = app.get("/api/v1/user/me", &cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["email"], "me@example.com");

    let request = axum::http::Request::builder()
        .uri("/api/v1/user/me")
        .header(
            "authorization",
            format!("Bearer {}", cookies.get("access_token").unwrap()),
        )
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_token_is_not_an_access_token(pool: PgPool) {
    create_test_user(&pool, "swap@example.com").await;
    let app = common::build_test_app(pool);
    let cookies = app.login("swap@example.com", TEST_PASSWORD).await;

    let refresh = cookies.get("refresh_token").unwrap().to_string();
    let swapped = cookies.with("access_token", &refresh);
    let response = app.get("/api/v1/user/me", &swapped).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Refresh
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_requires_matching_csrf_header(pool: PgPool) {
    create_test_user(&pool, "csrf@example.com").await;
    let app = common::build_test_app(pool);
    let cookies = app.login("csrf@example.com", TEST_PASSWORD).await;

    let missing = app
        .post_json_with("/api/v1/auth/refresh", json!({}), &cookies, None)
        .await;
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(missing).await["code"], "CSRF_MISMATCH");

    let wrong = app
        .post_json_with(
            "/api/v1/auth/refresh",
            json!({}),
            &cookies,
            Some("not-the-cookie-value"),
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    // The rejected attempts consumed nothing: the session still refreshes.
    let ok = app.refresh(&cookies).await;
    assert_eq!(ok.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_without_cookie_is_unauthorized(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = app.refresh(&Cookies::default()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid refresh token");

    let garbage = Cookies::default()
        .with("refresh_token", "not.a.jwt")
        .with("csrf_token", "abc");
    let response = app.refresh(&garbage).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid refresh token");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_session_and_retires_old_access_token(pool: PgPool) {
    create_test_user(&pool, "rotate@example.com").await;
    let app = common::build_test_app(pool);
    let original = app.login("rotate@example.com", TEST_PASSWORD).await;

    let response = app.refresh(&original).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = Cookies::from_response(&response);
    assert_ne!(rotated.get("refresh_token"), original.get("refresh_token"));
    assert_ne!(rotated.get("access_token"), original.get("access_token"));
    assert_ne!(rotated.get("csrf_token"), original.get("csrf_token"));

    // The access token presented alongside the refresh is blacklisted.
    let response = app.get("/api/v1/user/me", &original).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app.get("/api/v1/user/me", &rotated).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Rotation leaves the previous refresh token usable until it expires.
    let response = app.refresh(&original.without("access_token")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fourth_refresh_in_window_is_rate_limited(pool: PgPool) {
    create_test_user(&pool, "burst@example.com").await;
    let app = common::build_test_app(pool);
    let mut cookies = app.login("burst@example.com", TEST_PASSWORD).await;

    for _ in 0..3 {
        let response = app.refresh(&cookies).await;
        assert_eq!(response.status(), StatusCode::OK);
        cookies = Cookies::from_response(&response);
    }

    let response = app.refresh(&cookies).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_access_token_is_renewed_by_refresh(pool: PgPool) {
    create_test_user(&pool, "expiry@example.com").await;
    let app = common::build_test_app_with_policy(
        pool,
        TokenPolicy {
            access_ttl_secs: 1,
            ..TokenPolicy::default()
        },
    );
    let cookies = app.login("expiry@example.com", TEST_PASSWORD).await;
    assert_eq!(
        app.get("/api/v1/user/me", &cookies).await.status(),
        StatusCode::OK
    );

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let response = app.get("/api/v1/user/me", &cookies).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.refresh(&cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    let renewed = Cookies::from_response(&response);

    let response = app.get("/api/v1/user/me", &renewed).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Logout and password change
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_access_and_refresh_tokens(pool: PgPool) {
    create_test_user(&pool, "logout@example.com").await;
    let app = common::build_test_app(pool);
    let cookies = app.login("logout@example.com", TEST_PASSWORD).await;

    let response = app
        .post_json_with("/api/v1/auth/logout", json!({}), &cookies, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = set_cookie_headers(&response);
    assert_eq!(cleared.len(), 3);
    assert!(cleared.iter().all(|h| h.contains("Max-Age=0")));
    assert_eq!(body_json(response).await["message"], "Successfully logged out");

    let response = app.get("/api/v1/user/me", &cookies).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.refresh(&cookies.without("access_token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_requires_authentication(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = app
        .post_json_with("/api/v1/auth/logout", json!({}), &Cookies::default(), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn password_change_revokes_refresh_tokens(pool: PgPool) {
    create_test_user(&pool, "change@example.com").await;
    let app = common::build_test_app(pool);
    let cookies = app.login("change@example.com", TEST_PASSWORD).await;

    let wrong = app
        .post_json_with(
            "/api/v1/auth/account-password",
            json!({ "current_password": "N0t!ThePassword", "new_password": "N3w!Password" }),
            &cookies,
            None,
        )
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json_with(
            "/api/v1/auth/account-password",
            json!({ "current_password": TEST_PASSWORD, "new_password": "N3w!Password" }),
            &cookies,
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.refresh(&cookies.without("access_token")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    app.login("change@example.com", "N3w!Password").await;
}
