//! Order lifecycle route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::TimeDelta;
use serde::Deserialize;
use tracing::instrument;

use velvet_haze_core::{OrderId, OrderStatus};

use crate::config::{MAX_PAYMENT_TIMEOUT_MINUTES, payment_timeout_from_minutes};
use crate::error::{ActionResponse, AppError, Result};
use crate::models::{ShippingAddress, TrackingInfo};
use crate::state::AppState;

/// Reason recorded when staff cancel without giving one.
pub const DEFAULT_CANCEL_REASON: &str = "cancelled by staff";

// =============================================================================
// Request Types
// =============================================================================

/// Request to cancel an order.
#[derive(Debug, Default, Deserialize)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelOrderRequest {
    fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_CANCEL_REASON)
    }
}

/// Request to move an order to a new status.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub carrier: Option<String>,
}

impl UpdateStatusRequest {
    /// Tracking metadata, if a tracking number was given.
    fn tracking(&self) -> Result<Option<TrackingInfo>> {
        let tracking_number = self
            .tracking_number
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let carrier = self
            .carrier
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);

        match tracking_number {
            Some(number) => Ok(Some(TrackingInfo {
                tracking_number: number.to_string(),
                carrier,
            })),
            None if carrier.is_some() => Err(AppError::BadRequest(
                "carrier requires a tracking_number".to_string(),
            )),
            None => Ok(None),
        }
    }
}

/// Request to run the payment-timeout sweep now.
#[derive(Debug, Default, Deserialize)]
pub struct SweepRequest {
    #[serde(default)]
    pub timeout_minutes: Option<i64>,
}

// =============================================================================
// Router
// =============================================================================

/// Order routes, all under `/api/orders`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders/sweep", post(sweep_orders))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/cancel", post(cancel_order))
        .route("/api/orders/{id}/status", post(update_status))
        .route("/api/orders/{id}/address", post(update_address))
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/orders/{id}
#[instrument(skip(state))]
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
) -> Result<Json<ActionResponse>> {
    let order = state.orders().get_order(id).await?;
    Ok(Json(ActionResponse::ok(format!("order {id}"), &order)))
}

/// POST /api/orders/{id}/cancel
///
/// The body is optional; without one the default reason is recorded.
#[instrument(skip(state, req))]
async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    req: Option<Json<CancelOrderRequest>>,
) -> Result<Json<ActionResponse>> {
    let Json(req) = req.unwrap_or_default();
    let cancelled = state.orders().cancel_order(id, req.reason()).await?;

    Ok(Json(ActionResponse::ok(
        format!(
            "order {id} cancelled, {} units restored",
            cancelled.restored_units()
        ),
        &cancelled,
    )))
}

/// POST /api/orders/{id}/status
#[instrument(skip(state, req), fields(status = %req.status))]
async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ActionResponse>> {
    let tracking = req.tracking()?;
    let order = state
        .orders()
        .update_order_status(id, req.status, tracking)
        .await?;

    Ok(Json(ActionResponse::ok(
        format!("order {id} is now {}", order.status),
        &order,
    )))
}

/// POST /api/orders/{id}/address
#[instrument(skip(state, address))]
async fn update_address(
    State(state): State<AppState>,
    Path(id): Path<OrderId>,
    Json(address): Json<ShippingAddress>,
) -> Result<Json<ActionResponse>> {
    let order = state.orders().update_shipping_address(id, address).await?;

    Ok(Json(ActionResponse::ok(
        format!("shipping address of order {id} updated"),
        &order,
    )))
}

/// POST /api/orders/sweep
///
/// The body is optional; without one the configured timeout applies.
#[instrument(skip(state, req))]
async fn sweep_orders(
    State(state): State<AppState>,
    req: Option<Json<SweepRequest>>,
) -> Result<Json<ActionResponse>> {
    let Json(req) = req.unwrap_or_default();
    let timeout = match req.timeout_minutes {
        Some(minutes) => timeout_from_minutes(minutes)?,
        None => state.config().payment_timeout,
    };

    let report = state.orders().sweep_older_than(timeout).await?;

    Ok(Json(ActionResponse::ok(
        format!(
            "swept {} orders: {} cancelled, {} skipped, {} failed",
            report.outcomes.len(),
            report.cancelled_count(),
            report.skipped_count(),
            report.failed_count()
        ),
        &report,
    )))
}

fn timeout_from_minutes(minutes: i64) -> Result<TimeDelta> {
    payment_timeout_from_minutes(minutes).ok_or_else(|| {
        AppError::BadRequest(format!(
            "timeout_minutes must be between 1 and {MAX_PAYMENT_TIMEOUT_MINUTES}"
        ))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reason_defaults() {
        assert_eq!(CancelOrderRequest::default().reason(), DEFAULT_CANCEL_REASON);

        let req: CancelOrderRequest = serde_json::from_str(r#"{"reason": "  "}"#).unwrap();
        assert_eq!(req.reason(), DEFAULT_CANCEL_REASON);

        let req: CancelOrderRequest =
            serde_json::from_str(r#"{"reason": "customer request"}"#).unwrap();
        assert_eq!(req.reason(), "customer request");
    }

    #[test]
    fn test_status_request_tracking() {
        let req: UpdateStatusRequest = serde_json::from_str(
            r#"{"status": "shipped", "tracking_number": " 1Z999 ", "carrier": "UPS"}"#,
        )
        .unwrap();
        assert_eq!(req.status, OrderStatus::Shipped);
        let tracking = req.tracking().unwrap().unwrap();
        assert_eq!(tracking.tracking_number, "1Z999");
        assert_eq!(tracking.carrier.as_deref(), Some("UPS"));

        let req: UpdateStatusRequest = serde_json::from_str(r#"{"status": "paid"}"#).unwrap();
        assert!(req.tracking().unwrap().is_none());

        let req: UpdateStatusRequest =
            serde_json::from_str(r#"{"status": "shipped", "carrier": "UPS"}"#).unwrap();
        assert!(req.tracking().is_err());
    }

    #[test]
    fn test_status_request_rejects_unknown_status() {
        let req: std::result::Result<UpdateStatusRequest, _> =
            serde_json::from_str(r#"{"status": "lost"}"#);
        assert!(req.is_err());
    }

    #[test]
    fn test_timeout_from_minutes() {
        assert_eq!(timeout_from_minutes(45).unwrap(), TimeDelta::minutes(45));
        assert!(timeout_from_minutes(0).is_err());
        assert!(timeout_from_minutes(-1).is_err());
        assert!(timeout_from_minutes(i64::MAX).is_err());
    }

    #[test]
    fn test_timeout_from_minutes_is_capped() {
        assert_eq!(
            timeout_from_minutes(MAX_PAYMENT_TIMEOUT_MINUTES).unwrap(),
            TimeDelta::minutes(MAX_PAYMENT_TIMEOUT_MINUTES)
        );
        assert!(matches!(
            timeout_from_minutes(1_000_000_000_000),
            Err(AppError::BadRequest(_))
        ));
        assert!(timeout_from_minutes(MAX_PAYMENT_TIMEOUT_MINUTES + 1).is_err());

        // Every accepted timeout yields a cutoff
        let timeout = timeout_from_minutes(MAX_PAYMENT_TIMEOUT_MINUTES).unwrap();
        assert!(crate::services::sweep_cutoff(chrono::Utc::now(), timeout).is_some());
    }

    #[test]
    fn test_missing_bodies_use_defaults() {
        let Json(req) = None::<Json<SweepRequest>>.unwrap_or_default();
        assert!(req.timeout_minutes.is_none());

        let Json(req) = None::<Json<CancelOrderRequest>>.unwrap_or_default();
        assert_eq!(req.reason(), DEFAULT_CANCEL_REASON);
    }
}
