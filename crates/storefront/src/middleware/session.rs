//! Session middleware configuration and the session-token cookie.
//!
//! Two cookies travel with a signed-in browser:
//!
//! - `vh_session` - the tower-sessions id, backed by `PostgreSQL`
//! - `vh_session_token` - the single-session token checked by the session guard

use axum::http::{HeaderMap, HeaderValue, header};
use sqlx::PgPool;
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use velvet_haze_core::SessionToken;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "vh_session";

/// Session token cookie name.
pub const SESSION_TOKEN_COOKIE_NAME: &str = "vh_session_token";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the storefront migrations.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(
            SESSION_EXPIRY_SECONDS,
        )))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Build the `Set-Cookie` cookie carrying a freshly issued token.
#[must_use]
pub fn session_token_cookie(token: &SessionToken, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_TOKEN_COOKIE_NAME, token.as_str().to_owned()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::seconds(SESSION_EXPIRY_SECONDS))
        .build()
}

/// Build the cookie that deletes the token cookie in the browser.
#[must_use]
pub fn session_token_removal_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_TOKEN_COOKIE_NAME, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    cookie.make_removal();
    cookie
}

/// Append a `Set-Cookie` header for `cookie`.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!(cookie = cookie.name(), error = %e, "Invalid Set-Cookie value"),
    }
}

/// Read the session token presented by the client, if any.
///
/// A malformed value is treated as absent.
#[must_use]
pub fn read_session_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_TOKEN_COOKIE_NAME)
        .and_then(|cookie| SessionToken::parse(cookie.value()).ok())
}
