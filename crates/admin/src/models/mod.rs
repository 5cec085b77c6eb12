//! Domain models for the admin back office.

pub mod order;
pub mod restock;

pub use order::{
    CancelledOrder, Order, OrderItem, RestoredStock, ShippingAddress, ShippingAddressError,
    TrackingInfo,
};
pub use restock::{NotifyOutcome, RestockSubscription};
