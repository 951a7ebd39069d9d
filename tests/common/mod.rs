//! Shared harness for integration tests.
//!
//! Builds the full router over the in-memory store with a manual clock
//! and a recording notifier, so flows run without Postgres or SMTP.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::util::ServiceExt;

use edit_auth_service::{
    build_router,
    config::{
        AppConfig, DatabaseConfig, Environment, OtpConfig, SecurityConfig, SmtpConfig, TokenConfig,
    },
    services::{ManualClock, MockNotifier},
    store::MemoryStore,
    AppState,
};

pub const BASE_URL: &str = "http://localhost:3000";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<MockNotifier>,
}

impl TestApp {
    pub fn spawn() -> Self {
        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Arc::new(MockNotifier::new());

        let state = AppState::new(
            test_config(),
            Arc::new(store.clone()),
            clock.clone(),
            notifier.clone(),
        );
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            clock,
            notifier,
        }
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds");
        self.router.clone().oneshot(request).await.expect("router responds")
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request builds");
        self.router.clone().oneshot(request).await.expect("router responds")
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        let request = Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .expect("request builds");
        self.router.clone().oneshot(request).await.expect("router responds")
    }

    /// Run the full OTP flow and return the session cookie pair
    /// ("edit_token=...") from the login response.
    pub async fn login(&self, email: &str) -> String {
        let res = self
            .post_json("/auth/otp/request", serde_json::json!({ "email": email }))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let code = self.notifier.last_body().expect("a code was dispatched");

        let res = self
            .post_json(
                "/auth/login",
                serde_json::json!({ "email": email, "code": code }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        session_cookie(&res).expect("login sets the session cookie")
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        environment: Environment::Dev,
        service_name: "edit-auth-service-test".to_string(),
        log_level: "error".to_string(),
        port: 0,
        base_url: BASE_URL.to_string(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
        },
        token: TokenConfig {
            secret: "test-secret-at-least-32-characters!!".to_string(),
            session_ttl_minutes: 60,
            long_session_ttl_days: 7,
        },
        otp: OtpConfig {
            code_ttl_minutes: 10,
            link_ttl_minutes: 30,
            max_attempts: 5,
        },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from: "noreply@localhost".to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec![BASE_URL.to_string()],
        },
    }
}

/// Extract the `edit_token=<value>` pair from a Set-Cookie header.
pub fn session_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("edit_token="))
        .and_then(|v| v.split(';').next())
        .map(|v| v.to_string())
}

/// The raw Set-Cookie header for the session cookie, attributes included.
pub fn session_set_cookie(res: &Response<Body>) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("edit_token="))
        .map(|v| v.to_string())
}

pub fn location(res: &Response<Body>) -> String {
    res.headers()
        .get(header::LOCATION)
        .expect("a Location header")
        .to_str()
        .expect("Location is ASCII")
        .to_string()
}

pub async fn json_body(res: Response<Body>) -> serde_json::Value {
    let bytes = res
        .into_body()
        .collect()
        .await
        .expect("body reads")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}
