//! Single-active-session enforcement.
//!
//! Every successful login issues a fresh [`SessionToken`], persists it as the
//! user's one current token and hands it to the client in a cookie. On each
//! guarded request the presented token is compared with the persisted one; a
//! mismatch means another login happened since and this session is over.
//!
//! The store is reached through [`SessionTokenStore`] so the decision logic
//! can run against the `PostgreSQL` repository in production and an
//! in-memory store in tests.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tracing::instrument;

use velvet_haze_core::{SessionToken, UserId};

use crate::db::RepositoryError;

/// Persistence seam for the per-user current session token.
pub trait SessionTokenStore: Send + Sync {
    /// Load the user's current token. `None` if the user has no token or does not exist.
    fn load_session_token(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<SessionToken>, RepositoryError>> + Send;

    /// Overwrite the user's current token. `RepositoryError::NotFound` if the user does not exist.
    fn save_session_token(
        &self,
        user_id: UserId,
        token: &SessionToken,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// What to conclude when the token store cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionFailurePolicy {
    /// Treat the session as valid and let the request through.
    #[default]
    FailOpen,
    /// Treat the session as invalid and sign the user out.
    FailClosed,
}

impl SessionFailurePolicy {
    /// Configuration spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FailOpen => "fail_open",
            Self::FailClosed => "fail_closed",
        }
    }
}

impl fmt::Display for SessionFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_open" | "open" => Ok(Self::FailOpen),
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            other => Err(format!(
                "expected 'fail_open' or 'fail_closed', got '{other}'"
            )),
        }
    }
}

/// Why a session was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// A newer login replaced this session's token.
    Superseded,
    /// The token could not be checked and the policy is fail-closed.
    Unverified,
}

impl InvalidReason {
    /// Short code carried in the login redirect query string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Superseded => "session_superseded",
            Self::Unverified => "session_unverified",
        }
    }

    /// Human-readable explanation shown on the login page.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Superseded => "session superseded by another login",
            Self::Unverified => "your session could not be verified, please sign in again",
        }
    }

    /// Reverse of [`InvalidReason::code`].
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        [Self::Superseded, Self::Unverified]
            .into_iter()
            .find(|reason| reason.code() == code)
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a session validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionValidity {
    /// The request may proceed.
    Valid,
    /// The session must be terminated.
    Invalid(InvalidReason),
}

impl SessionValidity {
    /// Whether the request may proceed.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Errors from issuing a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The user row does not exist.
    #[error("user not found")]
    NotFound,

    /// The token could not be persisted.
    #[error("session store error: {0}")]
    Store(#[source] RepositoryError),
}

impl From<RepositoryError> for SessionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

/// Compare the persisted token with the one the client presented.
///
/// A user with no persisted token has nothing to be superseded by, so only a
/// present and different stored token invalidates the session. The values
/// are compared in constant time.
#[must_use]
pub fn compare_tokens(stored: Option<&SessionToken>, presented: &SessionToken) -> SessionValidity {
    match stored {
        Some(current) if !current.matches(presented) => {
            SessionValidity::Invalid(InvalidReason::Superseded)
        }
        _ => SessionValidity::Valid,
    }
}

/// Issues session tokens and checks presented tokens against the store.
pub struct SessionGuard<S> {
    store: S,
    policy: SessionFailurePolicy,
}

impl<S: SessionTokenStore> SessionGuard<S> {
    /// Create a guard over `store` with the given failure policy.
    #[must_use]
    pub const fn new(store: S, policy: SessionFailurePolicy) -> Self {
        Self { store, policy }
    }

    /// Issue a fresh token for `user_id`, replacing any earlier one.
    ///
    /// Every token issued before this call stops validating as soon as it returns.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the user does not exist, or
    /// `SessionError::Store` if the token could not be written.
    #[instrument(skip(self))]
    pub async fn issue_session(&self, user_id: UserId) -> Result<SessionToken, SessionError> {
        let token = SessionToken::generate();
        self.store.save_session_token(user_id, &token).await?;
        tracing::info!(user_id = %user_id, "Issued new session token");
        Ok(token)
    }

    /// Decide whether a request carrying `client_token` for `user_id` may proceed.
    ///
    /// Requests with no token or no authenticated user are always valid. Store
    /// read failures are resolved by the configured [`SessionFailurePolicy`].
    #[instrument(skip(self, client_token), fields(has_token = client_token.is_some()))]
    pub async fn check_session_validity(
        &self,
        client_token: Option<&SessionToken>,
        user_id: Option<UserId>,
    ) -> SessionValidity {
        let (Some(presented), Some(user_id)) = (client_token, user_id) else {
            return SessionValidity::Valid;
        };

        match self.store.load_session_token(user_id).await {
            Ok(stored) => {
                let validity = compare_tokens(stored.as_ref(), presented);
                if let SessionValidity::Invalid(reason) = validity {
                    tracing::info!(user_id = %user_id, reason = %reason, "Session rejected");
                }
                validity
            }
            Err(e) => match self.policy {
                SessionFailurePolicy::FailOpen => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Session token lookup failed, allowing request (fail-open)"
                    );
                    SessionValidity::Valid
                }
                SessionFailurePolicy::FailClosed => {
                    tracing::error!(
                        user_id = %user_id,
                        error = %e,
                        "Session token lookup failed, rejecting request (fail-closed)"
                    );
                    SessionValidity::Invalid(InvalidReason::Unverified)
                }
            },
        }
    }
}
