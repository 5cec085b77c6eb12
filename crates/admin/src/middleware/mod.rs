//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Bearer token check (`/api/*` only, as a route layer)

pub mod auth;

pub use auth::{bearer_token, require_api_token};
