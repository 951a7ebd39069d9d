pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::services::{
    AuthorizationGuard, Clock, Notifier, OneTimeCredentialService, SessionCookies, TokenService,
};
use crate::store::AuthStore;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn AuthStore>,
    pub one_time: Arc<OneTimeCredentialService>,
    pub tokens: TokenService,
    pub guard: AuthorizationGuard,
    pub cookies: SessionCookies,
}

impl AppState {
    /// Wire the service graph from its injected capabilities.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn AuthStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let one_time = Arc::new(OneTimeCredentialService::new(
            store.clone(),
            clock.clone(),
            notifier,
            models::CredentialPolicy {
                ttl: chrono::Duration::minutes(config.otp.code_ttl_minutes),
                max_attempts: config.otp.max_attempts,
            },
            models::CredentialPolicy {
                ttl: chrono::Duration::minutes(config.otp.link_ttl_minutes),
                max_attempts: config.otp.max_attempts,
            },
            config.base_url.clone(),
        ));
        let tokens = TokenService::new(&config.token.secret, clock);
        let guard = AuthorizationGuard::new(tokens.clone(), store.clone());
        let cookies = SessionCookies::new(config.environment == config::Environment::Prod);

        Self {
            config,
            store,
            one_time,
            tokens,
            guard,
            cookies,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/auth/session", get(handlers::session::introspect))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/otp/request", post(handlers::otp::request_otp))
        .route("/auth/otp/verify", post(handlers::otp::verify_otp))
        .route("/auth/login", post(handlers::session::login))
        .route("/auth/link", get(handlers::profile::redeem_link))
        .route("/auth/switch", get(handlers::profile::switch_profile))
        .route(
            "/auth/logout",
            get(handlers::session::logout).post(handlers::session::logout),
        )
        .merge(session_routes)
        .with_state(state.clone())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .filter_map(|o| {
                            o.parse::<axum::http::HeaderValue>()
                                .map_err(|e| {
                                    tracing::error!("Invalid CORS origin '{}': {}", o, e);
                                })
                                .ok()
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true),
        )
}

/// Service health check
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.ping().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::from(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
