//! Restock watchers: subscribe to a variant and notify when it is back.

use std::future::Future;

use thiserror::Error;
use tracing::{info, instrument};

use velvet_haze_core::{Email, EmailError, RestockSubscriptionId, VariantId};

use crate::db::RepositoryError;
use crate::models::{NotifyOutcome, RestockSubscription};

/// Persistence for restock watchers.
pub trait RestockStore: Send + Sync {
    fn variant_exists(
        &self,
        variant_id: VariantId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Flip every un-notified watcher of the variant to notified in one
    /// statement, returning the ids that changed.
    fn mark_subscriptions_notified(
        &self,
        variant_id: VariantId,
    ) -> impl Future<Output = Result<Vec<RestockSubscriptionId>, RepositoryError>> + Send;

    /// Insert a watcher. `Conflict` if an un-notified one already exists for
    /// this email and variant.
    fn create_subscription(
        &self,
        variant_id: VariantId,
        email: &Email,
    ) -> impl Future<Output = Result<RestockSubscription, RepositoryError>> + Send;
}

#[derive(Debug, Error)]
pub enum RestockError {
    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{email} is already waiting for variant {variant_id}")]
    AlreadySubscribed { variant_id: VariantId, email: Email },

    #[error("restock store failure: {0}")]
    Store(#[from] RepositoryError),
}

/// Restock watcher operations.
pub struct RestockService<S> {
    store: S,
}

impl<S: RestockStore> RestockService<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Mark all pending watchers of a variant as notified.
    ///
    /// Repeated calls report `NothingToNotify` once everyone has been told.
    ///
    /// # Errors
    ///
    /// Returns `VariantNotFound` for an unknown variant, `Store` on database failure.
    #[instrument(skip(self))]
    pub async fn notify_restock_subscribers(
        &self,
        variant_id: VariantId,
    ) -> Result<NotifyOutcome, RestockError> {
        if !self.store.variant_exists(variant_id).await? {
            return Err(RestockError::VariantNotFound(variant_id));
        }

        let notified = self.store.mark_subscriptions_notified(variant_id).await?;
        let outcome = NotifyOutcome::from_count(notified.len() as u64);

        info!(variant_id = %variant_id, notified = notified.len(), "Restock watchers notified");

        Ok(outcome)
    }

    /// Register `email` to hear when the variant is back in stock.
    ///
    /// # Errors
    ///
    /// - `InvalidEmail` if the address does not parse
    /// - `VariantNotFound` for an unknown variant
    /// - `AlreadySubscribed` if the email is already waiting on this variant
    /// - `Store` on database failure
    #[instrument(skip(self, email))]
    pub async fn subscribe_to_restock(
        &self,
        variant_id: VariantId,
        email: &str,
    ) -> Result<RestockSubscription, RestockError> {
        let email = Email::parse(email)?;

        if !self.store.variant_exists(variant_id).await? {
            return Err(RestockError::VariantNotFound(variant_id));
        }

        match self.store.create_subscription(variant_id, &email).await {
            Ok(subscription) => {
                info!(
                    variant_id = %variant_id,
                    subscription_id = %subscription.id,
                    "Restock watcher added"
                );
                Ok(subscription)
            }
            Err(RepositoryError::Conflict(_)) => {
                Err(RestockError::AlreadySubscribed { variant_id, email })
            }
            Err(RepositoryError::NotFound) => Err(RestockError::VariantNotFound(variant_id)),
            Err(e) => Err(e.into()),
        }
    }
}
