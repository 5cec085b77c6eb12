//! Customer accounts.

use chrono::{DateTime, Utc};

use velvet_haze_core::{Email, UserId};

/// A customer account, as loaded from `users`.
///
/// The password hash and the session token never leave the repository.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
