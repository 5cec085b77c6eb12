//! Login and registration failures.

use thiserror::Error;

use crate::db::RepositoryError;

/// Why a login or registration was refused.
///
/// Only `Repository` and `PasswordHash` are server faults; the rest are
/// answered to the customer.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] velvet_haze_core::EmailError),

    /// Unknown email or wrong password. The two are never told apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// Password outside the accepted length range.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}
