//! In-memory [`RestockStore`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use velvet_haze_admin::db::RepositoryError;
use velvet_haze_admin::models::RestockSubscription;
use velvet_haze_admin::services::RestockStore;
use velvet_haze_core::{Email, RestockSubscriptionId, VariantId};

use crate::lock;

#[derive(Default)]
struct State {
    variants: HashSet<VariantId>,
    subscriptions: Vec<RestockSubscription>,
}

/// Variants and their watchers.
#[derive(Clone, Default)]
pub struct MemoryRestockStore {
    state: Arc<Mutex<State>>,
}

impl MemoryRestockStore {
    /// Register a variant.
    pub fn add_variant(&self, variant_id: VariantId) {
        lock(&self.state).variants.insert(variant_id);
    }

    /// All watchers ever created, in insertion order.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<RestockSubscription> {
        lock(&self.state).subscriptions.clone()
    }
}

impl RestockStore for MemoryRestockStore {
    async fn variant_exists(&self, variant_id: VariantId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.state).variants.contains(&variant_id))
    }

    async fn mark_subscriptions_notified(
        &self,
        variant_id: VariantId,
    ) -> Result<Vec<RestockSubscriptionId>, RepositoryError> {
        let now = Utc::now();
        let mut state = lock(&self.state);

        Ok(state
            .subscriptions
            .iter_mut()
            .filter(|s| s.variant_id == variant_id && !s.notified)
            .map(|s| {
                s.notified = true;
                s.notified_at = Some(now);
                s.id
            })
            .collect())
    }

    async fn create_subscription(
        &self,
        variant_id: VariantId,
        email: &Email,
    ) -> Result<RestockSubscription, RepositoryError> {
        let mut state = lock(&self.state);

        if !state.variants.contains(&variant_id) {
            return Err(RepositoryError::NotFound);
        }
        if state
            .subscriptions
            .iter()
            .any(|s| s.variant_id == variant_id && !s.notified && &s.email == email)
        {
            return Err(RepositoryError::Conflict(
                "already subscribed to this variant".to_string(),
            ));
        }

        let next_id = i32::try_from(state.subscriptions.len() + 1).unwrap_or(i32::MAX);
        let subscription = RestockSubscription {
            id: RestockSubscriptionId::new(next_id),
            variant_id,
            email: email.clone(),
            notified: false,
            created_at: Utc::now(),
            notified_at: None,
        };
        state.subscriptions.push(subscription.clone());
        Ok(subscription)
    }
}
