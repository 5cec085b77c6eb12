//! Business logic services for admin.
//!
//! # Services
//!
//! - `orders` - Order lifecycle reconciler (cancel, status, address, sweep)
//! - `restock` - Restock watcher subscriptions and notification
//! - `sweeper` - Background loop running the payment-timeout sweep

pub mod orders;
pub mod restock;
pub mod sweeper;

pub use orders::{
    OrderReconciler, OrderStore, OrderTransaction, PAYMENT_TIMEOUT_REASON, ReconcileError,
    SweepOutcome, SweepReport, sweep_cutoff,
};
pub use restock::{RestockError, RestockService, RestockStore};
pub use sweeper::spawn_order_sweeper;
