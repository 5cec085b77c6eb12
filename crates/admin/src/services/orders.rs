//! Order lifecycle reconciler.
//!
//! Every mutation runs inside one [`OrderTransaction`]: the order row is
//! locked first, the status is checked against the transition graph, and
//! stock is restored with an atomic increment before the new status is
//! written. Returning early drops the transaction, which rolls it back, so a
//! failed cancellation never leaves stock half-restored.
//!
//! The sweep cancels unpaid orders past the payment timeout. Each order gets
//! its own transaction and a failure on one order never stops the batch.

use std::future::Future;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use velvet_haze_core::{OrderId, OrderStatus, VariantId};

use crate::db::RepositoryError;
use crate::models::{
    CancelledOrder, Order, RestoredStock, ShippingAddress, ShippingAddressError, TrackingInfo,
};

/// Cancel reason recorded by the sweep.
pub const PAYMENT_TIMEOUT_REASON: &str = "payment timeout";

// =============================================================================
// Store seams
// =============================================================================

/// Read access to orders plus the ability to open a transaction.
pub trait OrderStore: Send + Sync {
    /// Transaction type handed out by [`OrderStore::begin`].
    type Tx: OrderTransaction;

    /// Open a transaction. Dropping it without `commit` rolls back.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, RepositoryError>> + Send;

    /// Load an order and its items without locking.
    fn find_order(
        &self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Ids of `pending_payment` orders created before `cutoff`, oldest first.
    fn find_timed_out_orders(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<OrderId>, RepositoryError>> + Send;
}

/// Operations available inside one order transaction.
pub trait OrderTransaction: Send {
    /// Load and row-lock an order with its items (ordered by item id).
    fn lock_order(
        &mut self,
        order_id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// Add `quantity` to a variant's stock. `false` when the variant does not exist.
    fn restock_variant(
        &mut self,
        variant_id: VariantId,
        quantity: i32,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Set the order to `cancelled` with `reason`, returning the cancellation time.
    fn mark_cancelled(
        &mut self,
        order_id: OrderId,
        reason: &str,
    ) -> impl Future<Output = Result<DateTime<Utc>, RepositoryError>> + Send;

    /// Write a new status, attaching tracking metadata when given.
    fn set_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        tracking: Option<&TrackingInfo>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the shipping address.
    fn set_shipping_address(
        &mut self,
        order_id: OrderId,
        address: &ShippingAddress,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Make every change in this transaction visible.
    fn commit(self) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

// =============================================================================
// Errors
// =============================================================================

/// Why a reconciler operation was refused or failed.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("order {0} not found")]
    NotFound(OrderId),

    #[error("variant {0} not found")]
    VariantNotFound(VariantId),

    #[error("order {0} is already cancelled")]
    AlreadyCancelled(OrderId),

    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order {order_id} is {status}; its shipping address can no longer change")]
    AddressLocked {
        order_id: OrderId,
        status: OrderStatus,
    },

    #[error("payment timeout of {minutes} minutes is out of range")]
    TimeoutOutOfRange { minutes: i64 },

    #[error("invalid shipping address: {0}")]
    InvalidAddress(#[from] ShippingAddressError),

    #[error("order store failure: {0}")]
    Store(#[from] RepositoryError),
}

// =============================================================================
// Sweep report
// =============================================================================

/// What happened to one order during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SweepOutcome {
    Cancelled { order_id: OrderId, restored_units: i64 },
    /// The order moved on (paid, cancelled, deleted) after it was listed.
    Skipped { order_id: OrderId, reason: String },
    Failed { order_id: OrderId, error: String },
}

impl SweepOutcome {
    /// The order this outcome belongs to.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        match self {
            Self::Cancelled { order_id, .. }
            | Self::Skipped { order_id, .. }
            | Self::Failed { order_id, .. } => *order_id,
        }
    }
}

/// Per-order outcomes of one sweep, in the order they were processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub cutoff: DateTime<Utc>,
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    #[must_use]
    pub fn cancelled_count(&self) -> usize {
        self.count(|o| matches!(o, SweepOutcome::Cancelled { .. }))
    }

    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, SweepOutcome::Skipped { .. }))
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, SweepOutcome::Failed { .. }))
    }

    /// Total units returned to stock across all cancelled orders.
    #[must_use]
    pub fn restored_units(&self) -> i64 {
        self.outcomes
            .iter()
            .map(|o| match o {
                SweepOutcome::Cancelled { restored_units, .. } => *restored_units,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&SweepOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Drives orders through their lifecycle on top of an [`OrderStore`].
pub struct OrderReconciler<S> {
    store: S,
}

impl<S: OrderStore> OrderReconciler<S> {
    /// Create a reconciler over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Load an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the order does not exist, `Store` on database failure.
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, ReconcileError> {
        self.store
            .find_order(order_id)
            .await?
            .ok_or(ReconcileError::NotFound(order_id))
    }

    /// Cancel an order and put its items back in stock.
    ///
    /// Concurrent cancels of the same order serialize on the row lock; the
    /// loser sees `cancelled` and gets `AlreadyCancelled`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `AlreadyCancelled` if it was cancelled before
    /// - `InvalidTransition` if it has shipped or completed
    /// - `VariantNotFound` if an item's variant is gone (nothing is changed)
    /// - `Store` on database failure (nothing is changed)
    #[instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: OrderId,
        reason: &str,
    ) -> Result<CancelledOrder, ReconcileError> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(ReconcileError::NotFound(order_id))?;

        if order.status == OrderStatus::Cancelled {
            return Err(ReconcileError::AlreadyCancelled(order_id));
        }
        if !order.status.is_cancellable() {
            return Err(ReconcileError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        let mut restored = Vec::with_capacity(order.items.len());
        for item in &order.items {
            if !tx.restock_variant(item.variant_id, item.quantity).await? {
                warn!(
                    order_id = %order_id,
                    variant_id = %item.variant_id,
                    "Variant missing while restoring stock, rolling back"
                );
                return Err(ReconcileError::VariantNotFound(item.variant_id));
            }
            debug!(variant_id = %item.variant_id, quantity = item.quantity, "Stock restored");
            restored.push(RestoredStock {
                variant_id: item.variant_id,
                quantity: item.quantity,
            });
        }

        let cancelled_at = tx.mark_cancelled(order_id, reason).await?;
        tx.commit().await?;

        let cancelled = CancelledOrder {
            order_id,
            status: OrderStatus::Cancelled,
            reason: reason.to_string(),
            restored,
            cancelled_at,
        };

        info!(
            order_id = %order_id,
            previous_status = %order.status,
            restored_units = cancelled.restored_units(),
            "Order cancelled"
        );

        Ok(cancelled)
    }

    /// Cancel every unpaid order created before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns `Store` only if the candidate list cannot be loaded. Failures on
    /// individual orders are recorded in the report.
    #[instrument(skip(self))]
    pub async fn sweep_timed_out_orders(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<SweepReport, ReconcileError> {
        let candidates = self.store.find_timed_out_orders(cutoff).await?;
        let mut outcomes = Vec::with_capacity(candidates.len());

        for order_id in candidates {
            let outcome = match self.cancel_order(order_id, PAYMENT_TIMEOUT_REASON).await {
                Ok(cancelled) => SweepOutcome::Cancelled {
                    order_id,
                    restored_units: cancelled.restored_units(),
                },
                Err(
                    e @ (ReconcileError::AlreadyCancelled(_)
                    | ReconcileError::InvalidTransition { .. }
                    | ReconcileError::NotFound(_)),
                ) => {
                    info!(order_id = %order_id, reason = %e, "Sweep skipped order");
                    SweepOutcome::Skipped {
                        order_id,
                        reason: e.to_string(),
                    }
                }
                Err(e) => {
                    error!(order_id = %order_id, error = %e, "Sweep failed to cancel order");
                    SweepOutcome::Failed {
                        order_id,
                        error: e.to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let report = SweepReport { cutoff, outcomes };
        info!(
            cancelled = report.cancelled_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            restored_units = report.restored_units(),
            "Order sweep finished"
        );

        Ok(report)
    }

    /// Sweep orders older than `timeout`, measured from now.
    ///
    /// # Errors
    ///
    /// Returns `TimeoutOutOfRange` if `timeout` reaches past the earliest
    /// representable time; otherwise see [`Self::sweep_timed_out_orders`].
    pub async fn sweep_older_than(&self, timeout: TimeDelta) -> Result<SweepReport, ReconcileError> {
        let cutoff = sweep_cutoff(Utc::now(), timeout).ok_or(ReconcileError::TimeoutOutOfRange {
            minutes: timeout.num_minutes(),
        })?;
        self.sweep_timed_out_orders(cutoff).await
    }

    /// Move an order along the transition graph.
    ///
    /// `cancelled` is never accepted here since cancelling has to restore
    /// stock. Writing the current status again is allowed only to attach
    /// tracking metadata.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the order does not exist
    /// - `InvalidTransition` if the graph has no such edge
    /// - `Store` on database failure
    #[instrument(skip(self, tracking))]
    pub async fn update_order_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        tracking: Option<TrackingInfo>,
    ) -> Result<Order, ReconcileError> {
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(ReconcileError::NotFound(order_id))?;

        let allowed = match new_status {
            OrderStatus::Cancelled => false,
            s if s == order.status => tracking.is_some(),
            s => order.status.can_transition_to(s),
        };
        if !allowed {
            return Err(ReconcileError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }

        tx.set_status(order_id, new_status, tracking.as_ref())
            .await?;
        let updated = tx
            .lock_order(order_id)
            .await?
            .ok_or(ReconcileError::NotFound(order_id))?;
        tx.commit().await?;

        info!(
            order_id = %order_id,
            from = %order.status,
            to = %new_status,
            tracking = tracking.is_some(),
            "Order status updated"
        );

        Ok(updated)
    }

    /// Replace the shipping address of an order that has not shipped.
    ///
    /// # Errors
    ///
    /// - `InvalidAddress` if the address fails validation
    /// - `NotFound` if the order does not exist
    /// - `AddressLocked` once the order is past `paid`
    /// - `Store` on database failure
    #[instrument(skip(self, address))]
    pub async fn update_shipping_address(
        &self,
        order_id: OrderId,
        address: ShippingAddress,
    ) -> Result<Order, ReconcileError> {
        let address = address.validate()?;
        let mut tx = self.store.begin().await?;

        let order = tx
            .lock_order(order_id)
            .await?
            .ok_or(ReconcileError::NotFound(order_id))?;

        if !order.status.allows_address_change() {
            return Err(ReconcileError::AddressLocked {
                order_id,
                status: order.status,
            });
        }

        tx.set_shipping_address(order_id, &address).await?;
        let updated = tx
            .lock_order(order_id)
            .await?
            .ok_or(ReconcileError::NotFound(order_id))?;
        tx.commit().await?;

        info!(order_id = %order_id, "Shipping address updated");

        Ok(updated)
    }
}

/// The creation time before which an unpaid order counts as timed out.
///
/// `None` when `now - timeout` falls outside the representable range.
#[must_use]
pub fn sweep_cutoff(now: DateTime<Utc>, timeout: TimeDelta) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(timeout)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_readable() {
        let err = ReconcileError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "cannot move order from shipped to cancelled");

        let err = ReconcileError::AddressLocked {
            order_id: OrderId::new(9),
            status: OrderStatus::Shipped,
        };
        assert_eq!(
            err.to_string(),
            "order 9 is shipped; its shipping address can no longer change"
        );
        assert_eq!(
            ReconcileError::AlreadyCancelled(OrderId::new(3)).to_string(),
            "order 3 is already cancelled"
        );
    }

    #[test]
    fn test_sweep_report_counts() {
        let report = SweepReport {
            cutoff: Utc::now(),
            outcomes: vec![
                SweepOutcome::Cancelled {
                    order_id: OrderId::new(1),
                    restored_units: 3,
                },
                SweepOutcome::Failed {
                    order_id: OrderId::new(2),
                    error: "order store failure: database error".to_string(),
                },
                SweepOutcome::Cancelled {
                    order_id: OrderId::new(3),
                    restored_units: 2,
                },
                SweepOutcome::Skipped {
                    order_id: OrderId::new(4),
                    reason: "order 4 is already cancelled".to_string(),
                },
            ],
        };

        assert_eq!(report.cancelled_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.restored_units(), 5);
        assert_eq!(report.outcomes[1].order_id(), OrderId::new(2));
    }

    #[test]
    fn test_sweep_outcome_json() {
        let json = serde_json::to_value(SweepOutcome::Cancelled {
            order_id: OrderId::new(5),
            restored_units: 4,
        })
        .unwrap();
        assert_eq!(json["outcome"], "cancelled");
        assert_eq!(json["order_id"], 5);
    }

    #[test]
    fn test_sweep_cutoff() {
        let now = Utc::now();
        assert_eq!(
            sweep_cutoff(now, TimeDelta::minutes(30)),
            Some(now - TimeDelta::minutes(30))
        );
    }

    #[test]
    fn test_sweep_cutoff_overflow() {
        let huge = TimeDelta::try_minutes(1_000_000_000_000).unwrap();
        assert_eq!(sweep_cutoff(Utc::now(), huge), None);
        assert_eq!(sweep_cutoff(Utc::now(), TimeDelta::MAX), None);
    }
}
