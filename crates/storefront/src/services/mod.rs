//! Business logic services for storefront.
//!
//! - `auth` - Password registration and login
//! - `session_guard` - One active session per user

pub mod auth;
pub mod session_guard;

pub use session_guard::{
    InvalidReason, SessionError, SessionFailurePolicy, SessionGuard, SessionTokenStore,
    SessionValidity, compare_tokens,
};
