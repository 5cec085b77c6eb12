//! Status and shipping address updates.

#![allow(clippy::unwrap_used)]

use chrono::Utc;

use velvet_haze_admin::models::{ShippingAddress, TrackingInfo};
use velvet_haze_admin::services::{OrderReconciler, ReconcileError};
use velvet_haze_core::{OrderStatus, VariantId};
use velvet_haze_integration_tests::MemoryOrderStore;

const A: VariantId = VariantId::new(301);

async fn store_with_order(status: OrderStatus) -> (MemoryOrderStore, velvet_haze_core::OrderId) {
    let store = MemoryOrderStore::default();
    store.seed_variant(A, 7).await;
    let id = store.seed_order(status, &[(A, 2)], Utc::now()).await;
    (store, id)
}

fn tracking() -> TrackingInfo {
    TrackingInfo {
        tracking_number: "1Z999AA10123456784".to_string(),
        carrier: Some("UPS".to_string()),
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        name: "Grace Hopper".to_string(),
        line1: "1 Compiler Way".to_string(),
        line2: None,
        city: "Arlington".to_string(),
        region: Some("VA".to_string()),
        postal_code: "22201".to_string(),
        country: "us".to_string(),
    }
}

#[tokio::test]
async fn test_status_follows_the_graph() {
    let (store, id) = store_with_order(OrderStatus::PendingPayment).await;
    let reconciler = OrderReconciler::new(store.clone());

    let paid = reconciler
        .update_order_status(id, OrderStatus::Paid, None)
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);

    let shipped = reconciler
        .update_order_status(id, OrderStatus::Shipped, Some(tracking()))
        .await
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);
    assert_eq!(shipped.tracking_number.as_deref(), Some("1Z999AA10123456784"));
    assert_eq!(shipped.carrier.as_deref(), Some("UPS"));

    let completed = reconciler
        .update_order_status(id, OrderStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    assert_eq!(store.stock(A).await, Some(7));
}

#[tokio::test]
async fn test_status_rejects_graph_violations() {
    let cases = [
        (OrderStatus::Completed, OrderStatus::PendingPayment),
        (OrderStatus::Shipped, OrderStatus::Paid),
        (OrderStatus::PendingPayment, OrderStatus::Shipped),
        (OrderStatus::Cancelled, OrderStatus::Paid),
        (OrderStatus::Paid, OrderStatus::Completed),
    ];

    for (from, to) in cases {
        let (store, id) = store_with_order(from).await;
        let reconciler = OrderReconciler::new(store.clone());

        let err = reconciler.update_order_status(id, to, None).await.unwrap_err();

        assert!(
            matches!(err, ReconcileError::InvalidTransition { from: f, to: t } if f == from && t == to),
            "{from} -> {to} should be rejected"
        );
        assert_eq!(store.order(id).await.unwrap().status, from);
    }
}

#[tokio::test]
async fn test_status_never_cancels() {
    for from in [OrderStatus::PendingPayment, OrderStatus::Paid] {
        let (store, id) = store_with_order(from).await;
        let reconciler = OrderReconciler::new(store.clone());

        let err = reconciler
            .update_order_status(id, OrderStatus::Cancelled, None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::InvalidTransition { to: OrderStatus::Cancelled, .. }
        ));
        assert_eq!(store.order(id).await.unwrap().status, from);
        assert_eq!(store.stock(A).await, Some(7));
    }
}

#[tokio::test]
async fn test_same_status_only_to_attach_tracking() {
    let (store, id) = store_with_order(OrderStatus::Shipped).await;
    let reconciler = OrderReconciler::new(store.clone());

    assert!(matches!(
        reconciler
            .update_order_status(id, OrderStatus::Shipped, None)
            .await,
        Err(ReconcileError::InvalidTransition { .. })
    ));

    let updated = reconciler
        .update_order_status(id, OrderStatus::Shipped, Some(tracking()))
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert!(updated.tracking_number.is_some());
}

#[tokio::test]
async fn test_address_changes_until_paid() {
    for status in [OrderStatus::PendingPayment, OrderStatus::Paid] {
        let (store, id) = store_with_order(status).await;
        let reconciler = OrderReconciler::new(store.clone());

        let order = reconciler
            .update_shipping_address(id, address())
            .await
            .unwrap();

        let stored = order.shipping_address.unwrap();
        assert_eq!(stored.country, "US");
        assert_eq!(stored.city, "Arlington");
        assert_eq!(order.status, status);
    }
}

#[tokio::test]
async fn test_address_locked_after_paid() {
    for status in [
        OrderStatus::Shipped,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ] {
        let (store, id) = store_with_order(status).await;
        let reconciler = OrderReconciler::new(store.clone());

        let err = reconciler
            .update_shipping_address(id, address())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::AddressLocked { status: s, .. } if s == status
        ));
        assert!(store.order(id).await.unwrap().shipping_address.is_none());
    }
}

#[tokio::test]
async fn test_invalid_address_is_rejected_before_any_lookup() {
    let (store, id) = store_with_order(OrderStatus::Paid).await;
    let reconciler = OrderReconciler::new(store.clone());

    let mut bad = address();
    bad.postal_code = "   ".to_string();

    let err = reconciler.update_shipping_address(id, bad).await.unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidAddress(_)));
    assert!(store.order(id).await.unwrap().shipping_address.is_none());
}
