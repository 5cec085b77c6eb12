//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (database)
//!
//! # Orders (bearer token)
//! GET  /api/orders/{id}                     - Order with items
//! POST /api/orders/{id}/cancel              - Cancel and restore stock
//! POST /api/orders/{id}/status              - Move along the status graph
//! POST /api/orders/{id}/address             - Replace shipping address
//! POST /api/orders/sweep                    - Cancel unpaid orders past the timeout
//!
//! # Restock (bearer token)
//! POST /api/variants/{id}/restock-notify    - Notify pending watchers
//! POST /api/variants/{id}/subscriptions     - Add a watcher
//! ```

pub mod orders;
pub mod variants;

use axum::{Router, extract::State, http::StatusCode, middleware::from_fn_with_state, routing::get};

use crate::middleware::require_api_token;
use crate::state::AppState;

/// Create the `/api` routes, all behind the bearer token check.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(orders::router())
        .merge(variants::router())
        .route_layer(from_fn_with_state(state.clone(), require_api_token))
}

/// Create all routes for the admin.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(api_routes(state))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
