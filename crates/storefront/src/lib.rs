//! Velvet Haze Storefront library.
//!
//! Customer accounts, password login and the session guard that keeps each
//! customer to one active session. The binary in `main.rs` wires these into
//! an axum server; tests use the same router.

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

/// Build the storefront router with sessions enabled.
///
/// Sentry, tracing and request-id layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    Router::new()
        .merge(routes::routes(&state))
        .layer(session_layer)
        .with_state(state)
}
