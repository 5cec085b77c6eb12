//! Background loop that cancels unpaid orders past the payment timeout.

use std::time::Duration;

use chrono::TimeDelta;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::orders::OrderReconciler;
use crate::db::OrderRepository;

/// Spawn the sweeper. Runs one sweep per `interval`, the first immediately.
///
/// A failed sweep is logged and retried on the next tick.
pub fn spawn_order_sweeper(
    pool: PgPool,
    payment_timeout: TimeDelta,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = interval.as_secs(),
            timeout_minutes = payment_timeout.num_minutes(),
            "Order sweeper started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let reconciler = OrderReconciler::new(OrderRepository::new(&pool));
            if let Err(e) = reconciler.sweep_older_than(payment_timeout).await {
                let event_id = sentry::capture_error(&e);
                error!(error = %e, sentry_event_id = %event_id, "Order sweep failed");
            }
        }
    })
}
