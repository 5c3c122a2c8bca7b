#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use tollgate_api::auth::password::hash_password;
use tollgate_api::config::{AuthConfig, PaymentsConfig, ServerConfig};
use tollgate_api::mailer::Mailer;
use tollgate_api::router::build_app_router;
use tollgate_api::state::AppState;
use tollgate_core::token::TokenPolicy;
use tollgate_db::models::user::{CreateUser, User};
use tollgate_db::repositories::UserRepo;

/// Meets every password rule.
pub const TEST_PASSWORD: &str = "Str0ng!Passw0rd";

pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Build a test `ServerConfig` with safe defaults and non-`Secure` cookies.
pub fn test_config(token_policy: TokenPolicy) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        frontend_url: "http://localhost:5173".to_string(),
        auth: AuthConfig {
            access_secret: "test-access-secret".to_string(),
            refresh_secret: "test-refresh-secret".to_string(),
            cookie_secure: false,
            token_policy,
        },
        payments: PaymentsConfig {
            webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        },
    }
}

/// The production router, with a fixed peer address standing in for the
/// TCP connection.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with_policy(pool, TokenPolicy::default())
}

pub fn build_test_app_with_policy(pool: PgPool, policy: TokenPolicy) -> TestApp {
    let state = AppState::new(
        pool,
        test_config(policy),
        Mailer::log_only("http://localhost:5173"),
    );
    let router = build_app_router(state.clone())
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
    TestApp { router, state }
}

impl TestApp {
    /// Send one request. The router is cloned so limiter state carries over.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookies: &Cookies) -> Response<Body> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(COOKIE, cookies.header())
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        self.post_json_with(uri, body, &Cookies::default(), None).await
    }

    /// POST with session cookies and an optional `x-csrf-token` header.
    pub async fn post_json_with(
        &self,
        uri: &str,
        body: serde_json::Value,
        cookies: &Cookies,
        csrf: Option<&str>,
    ) -> Response<Body> {
        self.send_json(Method::POST, uri, body, cookies, csrf).await
    }

    pub async fn put_json_with(
        &self,
        uri: &str,
        body: serde_json::Value,
        cookies: &Cookies,
    ) -> Response<Body> {
        self.send_json(Method::PUT, uri, body, cookies, None).await
    }

    async fn send_json(
        &self,
        method: Method,
        uri: &str,
        body: serde_json::Value,
        cookies: &Cookies,
        csrf: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, cookies.header());
        if let Some(csrf) = csrf {
            builder = builder.header("x-csrf-token", csrf);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// POST a raw webhook body, signed with `signature` when given.
    pub async fn post_webhook(&self, body: &str, signature: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/webhooks/payments")
            .header(CONTENT_TYPE, "application/json");
        if let Some(signature) = signature {
            builder = builder.header("x-signature", signature);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Log in and return the session cookies.
    pub async fn login(&self, email: &str, password: &str) -> Cookies {
        let response = self
            .post_json(
                "/api/v1/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 200, "login should succeed");
        Cookies::from_response(&response)
    }

    /// POST /auth/refresh with the refresh and CSRF cookies of `cookies`.
    pub async fn refresh(&self, cookies: &Cookies) -> Response<Body> {
        let csrf = cookies.get("csrf_token").map(str::to_string);
        self.post_json_with(
            "/api/v1/auth/refresh",
            serde_json::json!({}),
            cookies,
            csrf.as_deref(),
        )
        .await
    }
}

/// Cookie jar built from `Set-Cookie` response headers.
#[derive(Debug, Clone, Default)]
pub struct Cookies(pub HashMap<String, String>);

impl Cookies {
    pub fn from_response(response: &Response<Body>) -> Self {
        let mut jar = HashMap::new();
        for value in response.headers().get_all(SET_COOKIE) {
            let raw = value.to_str().unwrap();
            let pair = raw.split(';').next().unwrap();
            let (name, value) = pair.split_once('=').unwrap();
            jar.insert(name.to_string(), value.to_string());
        }
        Self(jar)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.to_string(), value.to_string());
        self
    }

    pub fn without(mut self, name: &str) -> Self {
        self.0.remove(name);
        self
    }

    pub fn header(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Raw `Set-Cookie` header values of a response.
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Insert a user directly, bypassing the register endpoint.
pub async fn create_test_user(pool: &PgPool, email: &str) -> User {
    let password_hash = hash_password(TEST_PASSWORD).expect("hashing should succeed");
    UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: "Test User".to_string(),
            password_hash,
        },
    )
    .await
    .expect("user creation should succeed")
}
