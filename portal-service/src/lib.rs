pub mod config;
pub mod db;
pub mod dtos;
pub mod flows;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use portal_core::error::AppError;
use portal_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::config::PortalConfig;
use crate::db::Database;
use crate::flows::SubmissionTracker;
use crate::handlers::{auth, dashboard};
use crate::middleware::access_middleware;
use crate::models::RouteClassifier;
use crate::services::{AccessPolicy, IdentityProvider};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::metrics::metrics,
        handlers::auth::sign_in_page,
        handlers::auth::sign_in,
        handlers::auth::sign_up_page,
        handlers::auth::sign_up,
        handlers::auth::verify_sign_up,
        handlers::auth::sign_out,
        handlers::dashboard::home,
        handlers::dashboard::dashboard,
        handlers::dashboard::super_admin_dashboard,
        handlers::dashboard::org_admin_dashboard,
        handlers::dashboard::sub_admin_dashboard,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::SignInRequest,
            dtos::auth::SignUpRequest,
            dtos::auth::VerifyRequest,
            dtos::auth::FlowResponse,
            dtos::views::HeaderView,
            dtos::views::MenuItem,
            dtos::views::DashboardView,
            dtos::views::HomeView,
            flows::FlowStep,
            models::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sign-in, sign-up and sign-out against the identity provider"),
        (name = "Pages", description = "Role-gated page view models"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_token",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: PortalConfig,
    pub db: Database,
    pub identity: Arc<dyn IdentityProvider>,
    pub access: Arc<AccessPolicy>,
    pub submissions: Arc<SubmissionTracker>,
}

impl AppState {
    /// State with the standard route table and the configured policy for
    /// unclassified routes.
    pub fn new(config: PortalConfig, db: Database, identity: Arc<dyn IdentityProvider>) -> Self {
        let access = AccessPolicy::new(RouteClassifier::default(), config.access.unclassified_routes);
        Self {
            config,
            db,
            identity,
            access: Arc::new(access),
            submissions: Arc::new(SubmissionTracker::new()),
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Page not found"))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    layer.allow_origin(origins).allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    // Pages: every request, including unknown paths, goes through access control.
    let portal = Router::new()
        .route("/", get(dashboard::home))
        .route("/sign-in", get(auth::sign_in_page).post(auth::sign_in))
        .route("/sign-up", get(auth::sign_up_page).post(auth::sign_up))
        .route("/sign-up/verify", post(auth::verify_sign_up))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/super-admin/dashboard", get(dashboard::super_admin_dashboard))
        .route("/org-admin/dashboard", get(dashboard::org_admin_dashboard))
        .route("/sub-admin/dashboard", get(dashboard::sub_admin_dashboard))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), access_middleware));

    let ops = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/.well-known/openapi.json", get(openapi_json))
        .route("/sign-out", post(auth::sign_out));

    let cors = cors_layer(&state.config.security.allowed_origins);

    portal
        .merge(ops)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}
