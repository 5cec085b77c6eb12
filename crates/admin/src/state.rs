//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::db::{OrderRepository, RestockRepository};
use crate::services::{OrderReconciler, RestockService};

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: AdminConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, pool }),
        }
    }

    /// Get a reference to the admin configuration.
    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Order reconciler backed by `PostgreSQL`.
    #[must_use]
    pub fn orders(&self) -> OrderReconciler<OrderRepository<'_>> {
        OrderReconciler::new(OrderRepository::new(self.pool()))
    }

    /// Restock watcher service backed by `PostgreSQL`.
    #[must_use]
    pub fn restock(&self) -> RestockService<RestockRepository<'_>> {
        RestockService::new(RestockRepository::new(self.pool()))
    }
}
