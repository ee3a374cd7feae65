//! Route configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::{identity_middleware, rate_limit_middleware};
use crate::state::AppState;

/// Create the application router with state
///
/// ## Routes
/// - GET /health - Basic health check
/// - GET /health/ready - Readiness probe
/// - GET /health/live - Liveness probe
/// - GET /version - Version information
/// - GET /metrics - Prometheus scrape
/// - POST /send - Admit and forward a prompt
///
/// `/send` is guarded by two middleware layers, outermost first:
/// 1. **Identity**: resolves and verifies the caller, 401 otherwise.
/// 2. **Rate limit**: per-user quota when enabled, 429 otherwise.
///
/// Health, version and metrics routes are not guarded.
pub fn create_router_with_state(state: AppState) -> Router {
    let send_routes = Router::new()
        .route("/send", post(handlers::send))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity_middleware,
        ));

    let timeout = state.request_timeout;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/ready", get(handlers::ready))
        .route("/health/live", get(handlers::live))
        .route("/version", get(handlers::version))
        .route("/metrics", get(handlers::metrics))
        .merge(send_routes)
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}
