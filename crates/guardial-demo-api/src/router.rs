//! Route configuration

use axum::{
    routing::{get, post},
    Router,
};
use guardial_sdk::middleware::{self, MiddlewareOptions};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the application router
///
/// ## Routes
/// - GET /health - Local liveness check
/// - GET /health/guardial - Guardial connectivity self-test
/// - GET /version - Version information
/// - GET /api/users - List users
/// - POST /api/users - Create a user
/// - POST /api/chat - Prompt-guarded chat
///
/// Every `/api/*` route is analysed by the Guardial middleware. Health routes are not.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/users", get(handlers::list_users).post(handlers::create_user))
        .route("/api/chat", post(handlers::chat));
    let api_routes = middleware::install_with(
        api_routes,
        state.guardial.clone(),
        MiddlewareOptions::axum(),
    );

    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/guardial", get(handlers::guardial_health))
        .route("/version", get(handlers::version))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
