//! Velvet Haze Core - Shared types library.
//!
//! This crate provides common types used across all Velvet Haze components:
//! - `storefront` - Public-facing e-commerce site (session guard)
//! - `admin` - Back office (order lifecycle, stock restoration, restock alerts)
//! - `cli` - Command-line tools for migrations and the order sweep
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, session tokens,
//!   and the order status transition graph

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
