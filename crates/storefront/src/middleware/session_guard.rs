//! Middleware enforcing one active session per user.
//!
//! Runs in front of every guarded route. When the token cookie no longer
//! matches the user's current token the server session is flushed, the
//! token cookie is removed and the browser is sent back to the login page
//! with the reason in the query string.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use super::auth::{clear_current_user, current_user};
use super::session::{append_cookie, read_session_token, session_token_removal_cookie};
use crate::error::clear_sentry_user;
use crate::services::{InvalidReason, SessionValidity};
use crate::state::AppState;

/// Login page location for a terminated session.
#[must_use]
pub fn login_redirect_target(reason: InvalidReason) -> String {
    format!("/auth/login?error={}", reason.code())
}

/// Check the presented session token before the handler runs.
pub async fn session_guard_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let session = request.extensions().get::<Session>().cloned();
    let presented = read_session_token(request.headers());

    let user = match (&session, &presented) {
        (Some(session), Some(_)) => current_user(session).await,
        _ => None,
    };

    let validity = state
        .session_guard()
        .check_session_validity(presented.as_ref(), user.as_ref().map(|u| u.id))
        .await;

    match validity {
        SessionValidity::Valid => next.run(request).await,
        SessionValidity::Invalid(reason) => {
            if let Some(session) = &session
                && let Err(e) = clear_current_user(session).await
            {
                tracing::error!(error = %e, "Failed to flush terminated session");
            }
            clear_sentry_user();

            let mut response = Redirect::to(&login_redirect_target(reason)).into_response();
            append_cookie(
                response.headers_mut(),
                &session_token_removal_cookie(state.config().is_secure()),
            );
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_target() {
        assert_eq!(
            login_redirect_target(InvalidReason::Superseded),
            "/auth/login?error=session_superseded"
        );
        assert_eq!(
            login_redirect_target(InvalidReason::Unverified),
            "/auth/login?error=session_unverified"
        );
    }
}
