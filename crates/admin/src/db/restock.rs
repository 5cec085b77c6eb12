//! Database operations for restock subscriptions.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use velvet_haze_core::{Email, RestockSubscriptionId, VariantId};

use super::RepositoryError;
use crate::models::RestockSubscription;
use crate::services::restock::RestockStore;

#[derive(Debug, sqlx::FromRow)]
struct RestockSubscriptionRow {
    id: RestockSubscriptionId,
    variant_id: VariantId,
    email: String,
    notified: bool,
    created_at: DateTime<Utc>,
    notified_at: Option<DateTime<Utc>>,
}

impl TryFrom<RestockSubscriptionRow> for RestockSubscription {
    type Error = RepositoryError;

    fn try_from(row: RestockSubscriptionRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in subscription {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            variant_id: row.variant_id,
            email,
            notified: row.notified,
            created_at: row.created_at,
            notified_at: row.notified_at,
        })
    }
}

/// Repository for restock watchers.
pub struct RestockRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestockRepository<'a> {
    /// Create a new restock repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl RestockStore for RestockRepository<'_> {
    async fn variant_exists(&self, variant_id: VariantId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM commerce.product_variant WHERE id = $1)",
        )
        .bind(variant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    async fn mark_subscriptions_notified(
        &self,
        variant_id: VariantId,
    ) -> Result<Vec<RestockSubscriptionId>, RepositoryError> {
        let ids = sqlx::query_scalar::<_, RestockSubscriptionId>(
            r"
            UPDATE commerce.restock_subscription
            SET notified = TRUE, notified_at = NOW()
            WHERE variant_id = $1 AND notified = FALSE
            RETURNING id
            ",
        )
        .bind(variant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    async fn create_subscription(
        &self,
        variant_id: VariantId,
        email: &Email,
    ) -> Result<RestockSubscription, RepositoryError> {
        let row = sqlx::query_as::<_, RestockSubscriptionRow>(
            r"
            INSERT INTO commerce.restock_subscription (variant_id, email)
            VALUES ($1, $2)
            RETURNING id, variant_id, email, notified, created_at, notified_at
            ",
        )
        .bind(variant_id)
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return RepositoryError::Conflict(
                        "already subscribed to this variant".to_string(),
                    );
                }
                if db_err.is_foreign_key_violation() {
                    return RepositoryError::NotFound;
                }
            }
            RepositoryError::Database(e)
        })?;

        row.try_into()
    }
}
