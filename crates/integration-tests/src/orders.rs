//! In-memory [`OrderStore`] with transactional semantics.
//!
//! `begin` takes the whole commerce state behind an async mutex and works on
//! a copy. `commit` writes the copy back; dropping the transaction throws it
//! away. Holding the mutex for the life of the transaction stands in for the
//! row lock, so two transactions never interleave.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use velvet_haze_admin::db::RepositoryError;
use velvet_haze_admin::models::{Order, OrderItem, ShippingAddress, TrackingInfo};
use velvet_haze_admin::services::{OrderStore, OrderTransaction};
use velvet_haze_core::{OrderId, OrderItemId, OrderStatus, ProductId, UserId, VariantId};

use crate::lock;

/// Orders and variant stock levels.
#[derive(Debug, Clone, Default)]
pub struct CommerceState {
    pub orders: BTreeMap<OrderId, Order>,
    pub stock: BTreeMap<VariantId, i32>,
}

#[derive(Default)]
struct Faults {
    /// Fail the n-th (0-based) restock inside a transaction on this order.
    restock: HashMap<OrderId, usize>,
}

#[derive(Default)]
struct Inner {
    state: Arc<AsyncMutex<CommerceState>>,
    faults: Mutex<Faults>,
}

/// Shared handle over the in-memory commerce state.
#[derive(Clone, Default)]
pub struct MemoryOrderStore {
    inner: Arc<Inner>,
}

impl MemoryOrderStore {
    /// Add a variant with `stock` units on hand.
    pub async fn seed_variant(&self, variant_id: VariantId, stock: i32) {
        self.inner.state.lock().await.stock.insert(variant_id, stock);
    }

    /// Add an order with one item per `(variant, quantity)` pair.
    pub async fn seed_order(
        &self,
        status: OrderStatus,
        items: &[(VariantId, i32)],
        created_at: DateTime<Utc>,
    ) -> OrderId {
        let mut state = self.inner.state.lock().await;

        let next_order = state.orders.keys().next_back().map_or(1, |id| id.as_i32() + 1);
        let order_id = OrderId::new(next_order);
        let first_item = state
            .orders
            .values()
            .flat_map(|o| o.items.iter().map(|i| i.id.as_i32()))
            .max()
            .unwrap_or(0)
            + 1;

        let items = (first_item..)
            .zip(items)
            .map(|(item_id, &(variant_id, quantity))| OrderItem {
                id: OrderItemId::new(item_id),
                order_id,
                product_id: ProductId::new(variant_id.as_i32() / 100),
                variant_id,
                quantity,
            })
            .collect();

        let cancelled_at = (status == OrderStatus::Cancelled).then_some(created_at);
        state.orders.insert(
            order_id,
            Order {
                id: order_id,
                user_id: UserId::new(1),
                status,
                shipping_address: None,
                tracking_number: None,
                carrier: None,
                cancel_reason: cancelled_at.map(|_| "seeded".to_string()),
                cancelled_at,
                created_at,
                updated_at: created_at,
                items,
            },
        );

        order_id
    }

    /// Make the `nth` (0-based) stock restore fail in any transaction on `order_id`.
    pub fn fail_restock(&self, order_id: OrderId, nth: usize) {
        lock(&self.inner.faults).restock.insert(order_id, nth);
    }

    /// Current stock of a variant.
    pub async fn stock(&self, variant_id: VariantId) -> Option<i32> {
        self.inner.state.lock().await.stock.get(&variant_id).copied()
    }

    /// Current committed state of an order.
    pub async fn order(&self, order_id: OrderId) -> Option<Order> {
        self.inner.state.lock().await.orders.get(&order_id).cloned()
    }

    /// Snapshot of everything committed so far.
    pub async fn snapshot(&self) -> CommerceState {
        self.inner.state.lock().await.clone()
    }
}

impl OrderStore for MemoryOrderStore {
    type Tx = MemoryOrderTransaction;

    async fn begin(&self) -> Result<MemoryOrderTransaction, RepositoryError> {
        let committed = Arc::clone(&self.inner.state).lock_owned().await;
        let staged = committed.clone();

        Ok(MemoryOrderTransaction {
            committed,
            staged,
            store: self.clone(),
            locked: None,
            restocks: 0,
        })
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.order(order_id).await)
    }

    async fn find_timed_out_orders(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, RepositoryError> {
        let state = self.inner.state.lock().await;

        let mut candidates: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::PendingPayment && o.created_at < cutoff)
            .collect();
        candidates.sort_by_key(|o| (o.created_at, o.id));

        Ok(candidates.into_iter().map(|o| o.id).collect())
    }
}

/// A staged copy of the commerce state plus the lock on the committed one.
pub struct MemoryOrderTransaction {
    committed: OwnedMutexGuard<CommerceState>,
    staged: CommerceState,
    store: MemoryOrderStore,
    locked: Option<OrderId>,
    restocks: usize,
}

impl MemoryOrderTransaction {
    fn staged_order(&mut self, order_id: OrderId) -> Result<&mut Order, RepositoryError> {
        self.staged
            .orders
            .get_mut(&order_id)
            .ok_or(RepositoryError::NotFound)
    }
}

impl OrderTransaction for MemoryOrderTransaction {
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.locked = Some(order_id);
        Ok(self.staged.orders.get(&order_id).cloned())
    }

    async fn restock_variant(
        &mut self,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let attempt = self.restocks;
        self.restocks += 1;

        let injected = self
            .locked
            .and_then(|id| lock(&self.store.inner.faults).restock.get(&id).copied());
        if injected == Some(attempt) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }

        Ok(match self.staged.stock.get_mut(&variant_id) {
            Some(level) => {
                *level += quantity;
                true
            }
            None => false,
        })
    }

    async fn mark_cancelled(
        &mut self,
        order_id: OrderId,
        reason: &str,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let now = Utc::now();
        let order = self.staged_order(order_id)?;
        order.status = OrderStatus::Cancelled;
        order.cancel_reason = Some(reason.to_string());
        order.cancelled_at = Some(now);
        order.updated_at = now;
        Ok(now)
    }

    async fn set_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        tracking: Option<&TrackingInfo>,
    ) -> Result<(), RepositoryError> {
        let order = self.staged_order(order_id)?;
        order.status = status;
        if let Some(tracking) = tracking {
            order.tracking_number = Some(tracking.tracking_number.clone());
            if let Some(carrier) = &tracking.carrier {
                order.carrier = Some(carrier.clone());
            }
        }
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn set_shipping_address(
        &mut self,
        order_id: OrderId,
        address: &ShippingAddress,
    ) -> Result<(), RepositoryError> {
        let order = self.staged_order(order_id)?;
        order.shipping_address = Some(address.clone());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        *self.committed = self.staged;
        Ok(())
    }
}
