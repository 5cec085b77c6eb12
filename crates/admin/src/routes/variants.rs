//! Restock watcher route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use serde::Deserialize;
use tracing::instrument;

use velvet_haze_core::VariantId;

use crate::error::{ActionResponse, Result};
use crate::models::NotifyOutcome;
use crate::state::AppState;

/// Request to watch a variant.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
}

/// Variant routes, all under `/api/variants`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/variants/{id}/restock-notify", post(notify_subscribers))
        .route("/api/variants/{id}/subscriptions", post(subscribe))
}

/// POST /api/variants/{id}/restock-notify
#[instrument(skip(state))]
async fn notify_subscribers(
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
) -> Result<Json<ActionResponse>> {
    let outcome = state.restock().notify_restock_subscribers(id).await?;
    Ok(Json(ActionResponse::ok(notify_message(id, outcome), outcome)))
}

/// POST /api/variants/{id}/subscriptions
#[instrument(skip(state, req))]
async fn subscribe(
    State(state): State<AppState>,
    Path(id): Path<VariantId>,
    Json(req): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<ActionResponse>)> {
    let subscription = state.restock().subscribe_to_restock(id, &req.email).await?;

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse::ok(
            format!("{} will be told when variant {id} is back", subscription.email),
            &subscription,
        )),
    ))
}

fn notify_message(id: VariantId, outcome: NotifyOutcome) -> String {
    match outcome {
        NotifyOutcome::Notified { count: 1 } => format!("notified 1 watcher of variant {id}"),
        NotifyOutcome::Notified { count } => format!("notified {count} watchers of variant {id}"),
        NotifyOutcome::NothingToNotify => format!("no watchers left to notify for variant {id}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_message() {
        let id = VariantId::new(8);
        assert_eq!(
            notify_message(id, NotifyOutcome::Notified { count: 1 }),
            "notified 1 watcher of variant 8"
        );
        assert_eq!(
            notify_message(id, NotifyOutcome::Notified { count: 4 }),
            "notified 4 watchers of variant 8"
        );
        assert_eq!(
            notify_message(id, NotifyOutcome::NothingToNotify),
            "no watchers left to notify for variant 8"
        );
    }
}
