//! Unified error handling for admin.
//!
//! Every `/api/*` failure is rendered as an [`ActionResponse`] with
//! `success: false`. Store failures are captured to Sentry and their details
//! never reach the client.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::orders::ReconcileError;
use crate::services::restock::RestockError;

/// JSON body returned by every admin action.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionResponse {
    /// A successful response carrying `data`.
    pub fn ok(message: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: serde_json::to_value(data).ok(),
        }
    }

    /// A failed response with no payload.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order lifecycle operation refused or failed.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// Restock watcher operation refused or failed.
    #[error(transparent)]
    Restock(#[from] RestockError),

    /// Missing or wrong bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Reconcile(e) => match e {
                ReconcileError::NotFound(_) | ReconcileError::VariantNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ReconcileError::AlreadyCancelled(_) => StatusCode::CONFLICT,
                ReconcileError::InvalidTransition { .. } | ReconcileError::AddressLocked { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ReconcileError::InvalidAddress(_) | ReconcileError::TimeoutOutOfRange { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ReconcileError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Restock(e) => match e {
                RestockError::VariantNotFound(_) => StatusCode::NOT_FOUND,
                RestockError::AlreadySubscribed { .. } => StatusCode::CONFLICT,
                RestockError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                RestockError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
            // Don't expose internal error details to clients
            "Internal server error".to_string()
        } else {
            tracing::info!(status = status.as_u16(), error = %self, "Admin request refused");
            self.to_string()
        };

        (status, Json(ActionResponse::failure(message))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::RepositoryError;
    use velvet_haze_core::{OrderId, OrderStatus, VariantId};

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_reconcile_status_codes() {
        assert_eq!(
            status_of(ReconcileError::NotFound(OrderId::new(1))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ReconcileError::AlreadyCancelled(OrderId::new(1))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ReconcileError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::PendingPayment,
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(ReconcileError::TimeoutOutOfRange {
                minutes: 1_000_000_000_000
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ReconcileError::Store(RepositoryError::Database(
                sqlx::Error::PoolTimedOut
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_restock_status_codes() {
        assert_eq!(
            status_of(RestockError::VariantNotFound(VariantId::new(4))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("missing token".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_action_response_json() {
        let json = serde_json::to_value(ActionResponse::failure("nope")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "nope");
        assert!(json.get("data").is_none());

        let json = serde_json::to_value(ActionResponse::ok("done", 3)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 3);
    }
}
