//! Account route handlers.
//!
//! Mounted behind the session guard and `RequireAuth`.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use chrono::{DateTime, Utc};

use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub email: String,
    pub member_since: String,
}

impl AccountIndexTemplate {
    fn new(email: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            email: email.to_string(),
            member_since: created_at.format("%B %Y").to_string(),
        }
    }
}

/// Display account overview page.
///
/// The account is reloaded so the page reflects the stored email, not the
/// copy held in the session.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current_user): RequireAuth,
) -> Result<AccountIndexTemplate> {
    let user = UserRepository::new(state.pool())
        .get_by_id(current_user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", current_user.id)))?;

    Ok(AccountIndexTemplate::new(user.email.as_str(), user.created_at))
}
