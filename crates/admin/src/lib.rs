//! Velvet Haze Admin library.
//!
//! Back-office operations on the commerce schema: the order lifecycle
//! reconciler, stock restoration on cancellation, the payment-timeout sweep
//! and restock watchers. Exposed as a library so the CLI and the integration
//! tests drive the same code as the HTTP API.
//!
//! # Security
//!
//! The API can cancel orders and move stock. Bind it to a private interface
//! and keep `ADMIN_API_TOKEN` out of shell history.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::Router;

use crate::state::AppState;

/// Build the admin router.
///
/// Sentry and tracing layers are added by the binary.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes(&state))
        .with_state(state)
}
