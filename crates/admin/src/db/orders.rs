//! Database operations for orders and stock.
//!
//! Queries are checked at runtime. Status values travel as text and are
//! cast to `commerce.order_status` in SQL.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use velvet_haze_core::{OrderId, OrderStatus, UserId, VariantId};

use super::RepositoryError;
use crate::models::{Order, OrderItem, ShippingAddress, TrackingInfo};
use crate::services::orders::{OrderStore, OrderTransaction};

const SELECT_ORDER: &str = r#"
    SELECT id, user_id, status::text AS status, shipping_address, tracking_number,
           carrier, cancel_reason, cancelled_at, created_at, updated_at
    FROM commerce."order"
    WHERE id = $1
"#;

const SELECT_ORDER_FOR_UPDATE: &str = r#"
    SELECT id, user_id, status::text AS status, shipping_address, tracking_number,
           carrier, cancel_reason, cancelled_at, created_at, updated_at
    FROM commerce."order"
    WHERE id = $1
    FOR UPDATE
"#;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: String,
    shipping_address: Option<Json<ShippingAddress>>,
    tracking_number: Option<String>,
    carrier: Option<String>,
    cancel_reason: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| RepositoryError::DataCorruption(format!("order {}: {e}", self.id)))?;

        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            status,
            shipping_address: self.shipping_address.map(|Json(address)| address),
            tracking_number: self.tracking_number,
            carrier: self.carrier,
            cancel_reason: self.cancel_reason,
            cancelled_at: self.cancelled_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

/// Load an order and its items on one connection, optionally row-locking it.
async fn load_order(
    conn: &mut PgConnection,
    order_id: OrderId,
    lock: bool,
) -> Result<Option<Order>, RepositoryError> {
    let sql = if lock {
        SELECT_ORDER_FOR_UPDATE
    } else {
        SELECT_ORDER
    };

    let Some(row) = sqlx::query_as::<_, OrderRow>(sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, OrderItem>(
        r"
        SELECT id, order_id, product_id, variant_id, quantity
        FROM commerce.order_item
        WHERE order_id = $1
        ORDER BY id
        ",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    row.into_order(items).map(Some)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order reads and transactions.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for OrderRepository<'_> {
    type Tx = PgOrderTransaction;

    async fn begin(&self) -> Result<PgOrderTransaction, RepositoryError> {
        Ok(PgOrderTransaction {
            tx: self.pool.begin().await?,
        })
    }

    async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load_order(&mut conn, order_id, false).await
    }

    async fn find_timed_out_orders(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<OrderId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, OrderId>(
            r#"
            SELECT id
            FROM commerce."order"
            WHERE status = 'pending_payment' AND created_at < $1
            ORDER BY created_at, id
            "#,
        )
        .bind(cutoff)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }
}

/// An open order transaction. Rolls back when dropped without `commit`.
pub struct PgOrderTransaction {
    tx: Transaction<'static, Postgres>,
}

impl OrderTransaction for PgOrderTransaction {
    async fn lock_order(&mut self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        load_order(&mut self.tx, order_id, true).await
    }

    async fn restock_variant(
        &mut self,
        variant_id: VariantId,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE commerce.product_variant
            SET stock_quantity = stock_quantity + $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(variant_id)
        .bind(quantity)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_cancelled(
        &mut self,
        order_id: OrderId,
        reason: &str,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE commerce."order"
            SET status = 'cancelled', cancel_reason = $2, cancelled_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING cancelled_at
            "#,
        )
        .bind(order_id)
        .bind(reason)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    async fn set_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        tracking: Option<&TrackingInfo>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE commerce."order"
            SET status = $2::commerce.order_status,
                tracking_number = COALESCE($3, tracking_number),
                carrier = COALESCE($4, carrier),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(status.as_str())
        .bind(tracking.map(|t| t.tracking_number.as_str()))
        .bind(tracking.and_then(|t| t.carrier.as_deref()))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_shipping_address(
        &mut self,
        order_id: OrderId,
        address: &ShippingAddress,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE commerce."order"
            SET shipping_address = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(Json(address))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}
