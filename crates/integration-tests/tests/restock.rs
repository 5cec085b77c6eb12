//! Restock watcher scenarios.

#![allow(clippy::unwrap_used)]

use velvet_haze_admin::models::NotifyOutcome;
use velvet_haze_admin::services::{RestockError, RestockService};
use velvet_haze_core::VariantId;
use velvet_haze_integration_tests::MemoryRestockStore;

const VARIANT: VariantId = VariantId::new(401);
const OTHER: VariantId = VariantId::new(402);

fn service() -> (MemoryRestockStore, RestockService<MemoryRestockStore>) {
    let store = MemoryRestockStore::default();
    store.add_variant(VARIANT);
    store.add_variant(OTHER);
    (store.clone(), RestockService::new(store))
}

#[tokio::test]
async fn test_notify_reports_count_then_nothing() {
    let (store, service) = service();
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        service.subscribe_to_restock(VARIANT, email).await.unwrap();
    }
    service
        .subscribe_to_restock(OTHER, "a@example.com")
        .await
        .unwrap();

    assert_eq!(
        service.notify_restock_subscribers(VARIANT).await.unwrap(),
        NotifyOutcome::Notified { count: 3 }
    );
    assert_eq!(
        service.notify_restock_subscribers(VARIANT).await.unwrap(),
        NotifyOutcome::NothingToNotify
    );
    assert_eq!(
        service.notify_restock_subscribers(VARIANT).await.unwrap(),
        NotifyOutcome::NothingToNotify
    );

    let other_pending = store
        .subscriptions()
        .into_iter()
        .filter(|s| s.variant_id == OTHER && !s.notified)
        .count();
    assert_eq!(other_pending, 1);
}

#[tokio::test]
async fn test_notify_without_watchers() {
    let (_store, service) = service();
    assert_eq!(
        service.notify_restock_subscribers(VARIANT).await.unwrap(),
        NotifyOutcome::NothingToNotify
    );
}

#[tokio::test]
async fn test_unknown_variant() {
    let (_store, service) = service();
    let missing = VariantId::new(999);

    assert!(matches!(
        service.notify_restock_subscribers(missing).await,
        Err(RestockError::VariantNotFound(v)) if v == missing
    ));
    assert!(matches!(
        service.subscribe_to_restock(missing, "a@example.com").await,
        Err(RestockError::VariantNotFound(_))
    ));
}

#[tokio::test]
async fn test_duplicate_pending_subscription() {
    let (_store, service) = service();

    service
        .subscribe_to_restock(VARIANT, "shopper@example.com")
        .await
        .unwrap();
    let err = service
        .subscribe_to_restock(VARIANT, "Shopper@Example.com")
        .await
        .unwrap_err();
    assert!(matches!(err, RestockError::AlreadySubscribed { .. }));

    // Once notified, the same shopper may wait for the next restock
    service.notify_restock_subscribers(VARIANT).await.unwrap();
    assert!(
        service
            .subscribe_to_restock(VARIANT, "shopper@example.com")
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_invalid_email() {
    let (store, service) = service();

    let err = service
        .subscribe_to_restock(VARIANT, "not-an-email")
        .await
        .unwrap_err();
    assert!(matches!(err, RestockError::InvalidEmail(_)));
    assert!(store.subscriptions().is_empty());
}
