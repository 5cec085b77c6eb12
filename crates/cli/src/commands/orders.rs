//! Order maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Cancel unpaid orders older than ADMIN_ORDER_PAYMENT_TIMEOUT_MINUTES (default 30)
//! vh-cli orders sweep
//!
//! # Use a different timeout for this run
//! vh-cli orders sweep --timeout-minutes 120
//! ```
//!
//! # Environment Variables
//!
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_ORDER_PAYMENT_TIMEOUT_MINUTES` - Default timeout when no flag is given

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;

use velvet_haze_admin::config::{ConfigError, default_payment_timeout, parse_payment_timeout};
use velvet_haze_admin::db::{OrderRepository, create_pool};
use velvet_haze_admin::services::{OrderReconciler, ReconcileError, SweepOutcome};

use super::database_url;

const TIMEOUT_ENV: &str = "ADMIN_ORDER_PAYMENT_TIMEOUT_MINUTES";

#[derive(Debug, Error)]
pub enum OrdersError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("{0} orders could not be cancelled; see the log for details")]
    SweepIncomplete(usize),
}

/// Run the payment-timeout sweep once.
///
/// # Errors
///
/// Returns `OrdersError` if configuration or the database is unavailable, or
/// `SweepIncomplete` when any order failed to cancel.
pub async fn sweep(timeout_minutes: Option<i64>) -> Result<(), OrdersError> {
    dotenvy::dotenv().ok();

    let timeout = resolve_timeout(timeout_minutes, std::env::var(TIMEOUT_ENV).ok())?;
    let url = database_url("ADMIN_DATABASE_URL")
        .ok_or(OrdersError::MissingEnvVar("ADMIN_DATABASE_URL"))?;

    tracing::info!("Connecting to admin database...");
    let pool = create_pool(&SecretString::from(url)).await?;

    let reconciler = OrderReconciler::new(OrderRepository::new(&pool));
    let report = reconciler.sweep_older_than(timeout).await?;

    for outcome in &report.outcomes {
        match outcome {
            SweepOutcome::Cancelled {
                order_id,
                restored_units,
            } => tracing::info!(%order_id, restored_units, "cancelled"),
            SweepOutcome::Skipped { order_id, reason } => {
                tracing::info!(%order_id, %reason, "skipped");
            }
            SweepOutcome::Failed { order_id, error } => {
                tracing::error!(%order_id, %error, "failed");
            }
        }
    }

    tracing::info!(
        cutoff = %report.cutoff,
        cancelled = report.cancelled_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "Sweep complete"
    );

    match report.failed_count() {
        0 => Ok(()),
        failed => Err(OrdersError::SweepIncomplete(failed)),
    }
}

/// Pick the timeout: flag, then environment, then the default.
fn resolve_timeout(flag: Option<i64>, env: Option<String>) -> Result<TimeDelta, ConfigError> {
    match (flag, env) {
        (Some(minutes), _) => parse_payment_timeout(&minutes.to_string(), "--timeout-minutes"),
        (None, Some(raw)) => parse_payment_timeout(&raw, TIMEOUT_ENV),
        (None, None) => Ok(default_payment_timeout()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_timeout_precedence() {
        assert_eq!(
            resolve_timeout(Some(90), Some("15".to_string())).unwrap(),
            TimeDelta::minutes(90)
        );
        assert_eq!(
            resolve_timeout(None, Some("15".to_string())).unwrap(),
            TimeDelta::minutes(15)
        );
        assert_eq!(resolve_timeout(None, None).unwrap(), TimeDelta::minutes(30));
    }

    #[test]
    fn test_resolve_timeout_rejects_non_positive() {
        assert!(resolve_timeout(Some(0), None).is_err());
        assert!(resolve_timeout(None, Some("-3".to_string())).is_err());
    }
}
