use crate::config::{CorsConfig, RateLimitConfig};
use crate::error::{AppError, AppResult};
use crate::middleware::{request_id_middleware, ClientIpKeyExtractor};
use axum::middleware;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::admin_handlers;
use super::health;
use super::url_handlers;
use super::AppState;

/// Largest accepted request body; a target URL never needs more
const MAX_BODY_BYTES: usize = 16 * 1024;

/// Create application router
pub fn create_router(
    state: Arc<AppState>,
    cors_config: &CorsConfig,
    rate_limit_config: &RateLimitConfig,
) -> AppResult<axum::Router> {
    // Only creation writes to the store, so only creation is rate limited
    let governor_config = GovernorConfigBuilder::default()
        .per_millisecond(60_000 / rate_limit_config.requests_per_minute)
        .burst_size(rate_limit_config.burst_size)
        .key_extractor(ClientIpKeyExtractor::new(rate_limit_config.trust_proxy_headers))
        .finish()
        .ok_or_else(|| AppError::Configuration("Invalid rate limit settings".to_string()))?;
    let governor_layer = GovernorLayer::new(governor_config);

    // Configure CORS with specific origins
    let cors = if cors_config.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<http::HeaderValue> = cors_config
            .allowed_origins
            .iter()
            .filter_map(|s| s.parse::<http::HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let create_routes = axum::Router::new()
        .route("/url", post(url_handlers::create_url))
        .layer(governor_layer);

    let public_routes = axum::Router::new()
        .route("/", get(health::read_root))
        .route("/_health", get(health::health_check))
        .route("/{key}", get(url_handlers::forward_to_target_url))
        .route(
            "/admin/{secret_key}",
            get(admin_handlers::get_url_info).delete(admin_handlers::delete_url),
        );

    Ok(create_routes
        .merge(public_routes)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state))
}
