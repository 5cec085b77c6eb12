//! Authentication route handlers.
//!
//! Password login and registration both end in [`start_session`], which
//! issues a new session token (superseding every other device) and stores
//! the user in the server session.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::{
    append_cookie, clear_current_user, session_token_cookie, session_token_removal_cookie,
    set_current_user,
};
use crate::models::{CurrentUser, User};
use crate::services::InvalidReason;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template (sign-in and create-account forms).
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Map an `?error=` code to the text shown above the forms.
#[must_use]
pub fn error_message(code: &str) -> String {
    if let Some(reason) = InvalidReason::from_code(code) {
        return reason.message().to_string();
    }

    match code {
        "credentials" => "Invalid email or password.",
        "password_mismatch" => "Passwords do not match.",
        "weak_password" => "Password must be at least 8 characters.",
        "invalid_email" => "Please enter a valid email address.",
        "exists" => "An account with this email already exists.",
        _ => "Something went wrong, please try again.",
    }
    .to_string()
}

/// Map a `?success=` code to its confirmation text.
#[must_use]
pub fn success_message(code: &str) -> Option<String> {
    match code {
        "logged_out" => Some("You have been signed out.".to_string()),
        _ => None,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error.as_deref().map(error_message),
        success: query.success.as_deref().and_then(success_message),
    }
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.pool());

    match auth.login_with_password(&form.email, &form.password).await {
        Ok(user) => start_session(&state, &session, &user).await,
        Err(AuthError::InvalidCredentials | AuthError::InvalidEmail(_)) => {
            tracing::info!("Login rejected: invalid credentials");
            Redirect::to("/auth/login?error=credentials").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Login failed");
            Redirect::to("/auth/login?error=unavailable").into_response()
        }
    }
}

/// Handle registration form submission.
///
/// A new account is signed in straight away.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password_confirm {
        return Redirect::to("/auth/login?error=password_mismatch").into_response();
    }

    let auth = AuthService::new(state.pool());

    match auth
        .register_with_password(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            start_session(&state, &session, &user).await
        }
        Err(e) => {
            let code = match e {
                AuthError::InvalidEmail(_) => "invalid_email",
                AuthError::WeakPassword(_) => "weak_password",
                AuthError::UserAlreadyExists => "exists",
                other => {
                    tracing::error!(error = %other, "Registration failed");
                    "unavailable"
                }
            };
            Redirect::to(&format!("/auth/login?error={code}")).into_response()
        }
    }
}

/// Sign out: flush the server session and delete the token cookie.
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!(error = %e, "Failed to flush session on logout");
    }
    clear_sentry_user();

    let mut response = Redirect::to("/auth/login?success=logged_out").into_response();
    append_cookie(
        response.headers_mut(),
        &session_token_removal_cookie(state.config().is_secure()),
    );
    response
}

/// Issue a session token for `user`, record them in the session and send them to their account.
async fn start_session(state: &AppState, session: &Session, user: &User) -> Response {
    let token = match state.session_guard().issue_session(user.id).await {
        Ok(token) => token,
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(
                user_id = %user.id,
                error = %e,
                sentry_event_id = %event_id,
                "Failed to issue session token"
            );
            return Redirect::to("/auth/login?error=unavailable").into_response();
        }
    };

    if let Err(e) = set_current_user(session, &CurrentUser::from(user)).await {
        tracing::error!(user_id = %user.id, error = %e, "Failed to set session");
        return Redirect::to("/auth/login?error=unavailable").into_response();
    }

    set_sentry_user(&user.id, Some(user.email.as_str()));

    let mut response = Redirect::to("/account").into_response();
    append_cookie(
        response.headers_mut(),
        &session_token_cookie(&token, state.config().is_secure()),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_for_terminated_sessions() {
        assert_eq!(
            error_message("session_superseded"),
            "session superseded by another login"
        );
        assert_eq!(
            error_message("session_unverified"),
            InvalidReason::Unverified.message()
        );
    }

    #[test]
    fn test_error_message_unknown_code_is_generic() {
        assert_eq!(
            error_message("<script>"),
            "Something went wrong, please try again."
        );
    }

    #[test]
    fn test_success_message() {
        assert!(success_message("logged_out").is_some());
        assert!(success_message("anything").is_none());
    }

    #[test]
    fn test_login_template_renders_reason() {
        let html = LoginTemplate {
            error: Some(error_message("session_superseded")),
            success: None,
        }
        .render()
        .unwrap_or_default();
        assert!(html.contains("session superseded by another login"));
    }
}
