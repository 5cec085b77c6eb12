//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Session guard (guarded routes only)
//! 6. Rate limiting (auth routes only)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;
pub mod session_guard;

pub use auth::{RequireAuth, clear_current_user, current_user, set_current_user};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::{
    SESSION_TOKEN_COOKIE_NAME, append_cookie, create_session_layer, read_session_token,
    session_token_cookie, session_token_removal_cookie,
};
pub use session_guard::session_guard_middleware;
