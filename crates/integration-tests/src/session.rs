//! In-memory [`SessionTokenStore`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use velvet_haze_core::{SessionToken, UserId};
use velvet_haze_storefront::db::RepositoryError;
use velvet_haze_storefront::services::SessionTokenStore;

use crate::lock;

#[derive(Default)]
struct Inner {
    tokens: Mutex<HashMap<UserId, Option<SessionToken>>>,
    fail_reads: AtomicBool,
}

/// Per-user current token, keyed by user id.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<Inner>,
}

impl MemorySessionStore {
    /// A store holding `users`, none of them signed in yet.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = UserId>) -> Self {
        let store = Self::default();
        for user in users {
            store.add_user(user);
        }
        store
    }

    /// Create a user row with no token.
    pub fn add_user(&self, user_id: UserId) {
        lock(&self.inner.tokens).insert(user_id, None);
    }

    /// Make every token read fail until switched back.
    pub fn fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// The token currently persisted for `user_id`.
    #[must_use]
    pub fn current_token(&self, user_id: UserId) -> Option<SessionToken> {
        lock(&self.inner.tokens).get(&user_id).cloned().flatten()
    }
}

impl SessionTokenStore for MemorySessionStore {
    async fn load_session_token(
        &self,
        user_id: UserId,
    ) -> Result<Option<SessionToken>, RepositoryError> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(self.current_token(user_id))
    }

    async fn save_session_token(
        &self,
        user_id: UserId,
        token: &SessionToken,
    ) -> Result<(), RepositoryError> {
        let mut tokens = lock(&self.inner.tokens);
        let slot = tokens.get_mut(&user_id).ok_or(RepositoryError::NotFound)?;
        *slot = Some(token.clone());
        Ok(())
    }
}
