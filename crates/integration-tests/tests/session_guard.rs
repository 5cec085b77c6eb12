//! Single-active-session scenarios for the storefront session guard.

#![allow(clippy::unwrap_used)]

use velvet_haze_core::{SessionToken, UserId};
use velvet_haze_integration_tests::MemorySessionStore;
use velvet_haze_storefront::services::{
    InvalidReason, SessionError, SessionFailurePolicy, SessionGuard, SessionValidity,
};

const ALICE: UserId = UserId::new(1);
const BOB: UserId = UserId::new(2);

fn guard(store: &MemorySessionStore, policy: SessionFailurePolicy) -> SessionGuard<MemorySessionStore> {
    SessionGuard::new(store.clone(), policy)
}

#[tokio::test]
async fn test_newest_login_supersedes_every_earlier_token() {
    let store = MemorySessionStore::with_users([ALICE]);
    let guard = guard(&store, SessionFailurePolicy::FailOpen);

    let first = guard.issue_session(ALICE).await.unwrap();
    let second = guard.issue_session(ALICE).await.unwrap();
    let newest = guard.issue_session(ALICE).await.unwrap();

    assert_eq!(store.current_token(ALICE), Some(newest.clone()));
    assert!(
        guard
            .check_session_validity(Some(&newest), Some(ALICE))
            .await
            .is_valid()
    );
    for old in [&first, &second] {
        assert_eq!(
            guard.check_session_validity(Some(old), Some(ALICE)).await,
            SessionValidity::Invalid(InvalidReason::Superseded)
        );
    }
}

#[tokio::test]
async fn test_second_device_signs_out_the_first() {
    let store = MemorySessionStore::with_users([ALICE]);
    let guard = guard(&store, SessionFailurePolicy::FailOpen);

    let device_a = guard.issue_session(ALICE).await.unwrap();
    assert!(
        guard
            .check_session_validity(Some(&device_a), Some(ALICE))
            .await
            .is_valid()
    );

    let device_b = guard.issue_session(ALICE).await.unwrap();

    let a = guard.check_session_validity(Some(&device_a), Some(ALICE)).await;
    assert_eq!(a, SessionValidity::Invalid(InvalidReason::Superseded));
    assert_eq!(
        InvalidReason::Superseded.message(),
        "session superseded by another login"
    );

    let b = guard.check_session_validity(Some(&device_b), Some(ALICE)).await;
    assert_eq!(b, SessionValidity::Valid);
}

#[tokio::test]
async fn test_sessions_of_different_users_are_independent() {
    let store = MemorySessionStore::with_users([ALICE, BOB]);
    let guard = guard(&store, SessionFailurePolicy::FailOpen);

    let alice = guard.issue_session(ALICE).await.unwrap();
    let bob = guard.issue_session(BOB).await.unwrap();
    let _bob_again = guard.issue_session(BOB).await.unwrap();

    assert!(guard.check_session_validity(Some(&alice), Some(ALICE)).await.is_valid());
    assert!(!guard.check_session_validity(Some(&bob), Some(BOB)).await.is_valid());
}

#[tokio::test]
async fn test_missing_token_or_user_is_valid() {
    let store = MemorySessionStore::with_users([ALICE]);
    let guard = guard(&store, SessionFailurePolicy::FailClosed);
    guard.issue_session(ALICE).await.unwrap();

    assert!(guard.check_session_validity(None, Some(ALICE)).await.is_valid());
    assert!(
        guard
            .check_session_validity(Some(&SessionToken::generate()), None)
            .await
            .is_valid()
    );
    assert!(guard.check_session_validity(None, None).await.is_valid());
}

#[tokio::test]
async fn test_user_without_persisted_token_is_valid() {
    let store = MemorySessionStore::with_users([ALICE]);
    let guard = guard(&store, SessionFailurePolicy::FailOpen);

    let validity = guard
        .check_session_validity(Some(&SessionToken::generate()), Some(ALICE))
        .await;
    assert_eq!(validity, SessionValidity::Valid);
}

#[tokio::test]
async fn test_store_failure_fails_open_by_default() {
    let store = MemorySessionStore::with_users([ALICE]);
    let guard = guard(&store, SessionFailurePolicy::default());

    let token = guard.issue_session(ALICE).await.unwrap();
    let _newer = guard.issue_session(ALICE).await.unwrap();
    store.fail_reads(true);

    // Even a superseded token passes while the store cannot be read
    assert!(guard.check_session_validity(Some(&token), Some(ALICE)).await.is_valid());

    store.fail_reads(false);
    assert!(!guard.check_session_validity(Some(&token), Some(ALICE)).await.is_valid());
}

#[tokio::test]
async fn test_store_failure_fails_closed_when_configured() {
    let store = MemorySessionStore::with_users([ALICE]);
    let guard = guard(&store, SessionFailurePolicy::FailClosed);

    let token = guard.issue_session(ALICE).await.unwrap();
    store.fail_reads(true);

    assert_eq!(
        guard.check_session_validity(Some(&token), Some(ALICE)).await,
        SessionValidity::Invalid(InvalidReason::Unverified)
    );
}

#[tokio::test]
async fn test_issue_session_for_unknown_user() {
    let store = MemorySessionStore::default();
    let guard = guard(&store, SessionFailurePolicy::FailOpen);

    let err = guard.issue_session(UserId::new(99)).await.unwrap_err();
    assert!(matches!(err, SessionError::NotFound));
    assert_eq!(store.current_token(UserId::new(99)), None);
}

#[test]
fn test_issued_tokens_are_unique_and_cookie_safe() {
    let tokens: Vec<SessionToken> = (0..64).map(|_| SessionToken::generate()).collect();

    for (i, token) in tokens.iter().enumerate() {
        assert_eq!(token.as_str().len(), 43);
        assert!(SessionToken::parse(token.as_str()).is_ok());
        assert!(tokens.iter().skip(i + 1).all(|other| other != token));
    }
}
