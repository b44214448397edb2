//! Shared setup for portal-service integration tests.
//!
//! Requests run in-process through the full router with
//! `tower::ServiceExt::oneshot`; the identity provider is the in-memory mock
//! and the database pool never connects.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use portal_service::{
    build_router,
    config::{AccessConfig, DatabaseConfig, Environment, IdentityConfig, PortalConfig, SecurityConfig},
    db::Database,
    services::MockIdentityProvider,
    AppState,
};
use secrecy::Secret;
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> PortalConfig {
    PortalConfig {
        common: portal_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "portal-service".to_string(),
        service_version: "test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://localhost/portal_test".to_string()),
            max_connections: 2,
            min_connections: 0,
        },
        identity: IdentityConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            secret_key: Secret::new("sk_test".to_string()),
            timeout_ms: 1_000,
        },
        access: AccessConfig::default(),
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

/// Identity provider seeded with one user per role.
pub fn seeded_identity() -> MockIdentityProvider {
    MockIdentityProvider::new()
        .with_user("root@example.com", "root user", PASSWORD, &["org:super:admin", "org:admin"])
        .with_user("owner@example.com", "owner", PASSWORD, &["org:admin", "org:app:admin"])
        .with_user("lead@example.com", "lead", PASSWORD, &["org:sub:admin"])
        .with_user("ada@example.com", "ada", PASSWORD, &["org:member"])
        .with_user("plain@example.com", "plain", PASSWORD, &[])
}

pub struct TestApp {
    pub router: Router,
    pub identity: Arc<MockIdentityProvider>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(seeded_identity(), |_| {})
    }

    pub fn with(identity: MockIdentityProvider, configure: impl FnOnce(&mut PortalConfig)) -> Self {
        let _ = portal_core::observability::init_metrics();

        let mut config = test_config();
        configure(&mut config);

        let db = Database::lazy(&config.database).expect("lazy pool");
        let identity = Arc::new(identity);
        let state = AppState::new(config, db, identity.clone());

        Self {
            router: build_router(state.clone()),
            identity,
            state,
        }
    }

    /// Browser token for an existing user.
    pub fn token_for(&self, identifier: &str) -> String {
        self.identity.issue_token(identifier).expect("known user")
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.expect("router is infallible")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header(header::COOKIE, format!("__session={}", token));
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value, cookies: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if !cookies.is_empty() {
            let cookie = cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie);
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap()).await
    }
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// `Location` of a redirect, asserting the status is one.
pub fn redirect_location(response: &Response<Body>) -> String {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn assert_temporary_redirect(response: &Response<Body>, target: &str) {
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(redirect_location(response), target);
}

/// Value of a cookie set by the response; empty string when it is cleared.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| {
            let pair = v.split(';').next()?;
            let (cookie_name, value) = pair.split_once('=')?;
            (cookie_name.trim() == name).then(|| value.trim().to_string())
        })
}

pub fn set_cookie_header(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}
