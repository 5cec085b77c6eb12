//! In-memory stores for Velvet Haze scenario tests.
//!
//! Each store implements the same trait as its `PostgreSQL` repository, so
//! the session guard, order reconciler and restock service run unchanged on
//! top of them. Every store is a cheap `Clone` handle over shared state: hand
//! one clone to the service and keep another to seed data and assert on it.
//!
//! Transient database failures are simulated with
//! `sqlx::Error::PoolTimedOut`, the error a saturated pool returns.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p velvet-haze-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod orders;
pub mod restock;
pub mod session;

pub use orders::{CommerceState, MemoryOrderStore, MemoryOrderTransaction};
pub use restock::MemoryRestockStore;
pub use session::MemorySessionStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a std mutex, ignoring poisoning from an earlier panicking test.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
