//! Integration tests for the connection request lifecycle.
//!
//! Tests the full stack: ConnectionLifecycle -> validation -> MemoryStore.
//! Covers request creation, accept/reject/cancel transitions, the
//! one-row-per-pair invariant, quota enforcement, and authorization
//! error paths.

use std::sync::Arc;

use tierlink::{
    ConnectionLifecycle, ConnectionStatus, ConnectionType, HowMet, MemoryStore, UserId,
    MAX_FIRST_CONNECTIONS,
};

fn user(id: &str) -> UserId {
    UserId::new(id)
}

fn how_met() -> HowMet {
    HowMet::new("Met at a conference", Some(2019)).unwrap()
}

fn setup() -> (Arc<MemoryStore>, ConnectionLifecycle) {
    let store = Arc::new(MemoryStore::new());
    let lifecycle = ConnectionLifecycle::new(store.clone());
    (store, lifecycle)
}

/// Helper: full send + accept round trip for a `first` connection.
async fn connect_first(lifecycle: &ConnectionLifecycle, a: &str, b: &str) {
    let edge = lifecycle
        .send_request(user(a), user(b), how_met(), ConnectionType::First)
        .await
        .unwrap();
    lifecycle.accept_request(edge.id, &user(b)).await.unwrap();
}

// ============================================================================
// Sending requests
// ============================================================================

#[tokio::test]
async fn test_send_creates_pending_edge() {
    let (_store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    assert_eq!(edge.status, ConnectionStatus::Pending);
    assert_eq!(edge.connection_type, ConnectionType::First);
    assert_eq!(edge.requester_id, user("alice"));
    assert_eq!(edge.recipient_id, user("bob"));
    assert_eq!(edge.how_met.description(), "Met at a conference");
    assert_eq!(edge.how_met.year(), Some(2019));
    assert!(edge.upgrade_request.is_none());
}

#[tokio::test]
async fn test_send_to_self_rejected() {
    let (_store, lifecycle) = setup();

    let err = lifecycle
        .send_request(user("alice"), user("alice"), how_met(), ConnectionType::First)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_send_to_blocked_user_refused() {
    let (store, lifecycle) = setup();
    store.set_blocked(&user("alice"), &user("bob"), true);

    let err = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap_err();
    assert!(err.is_not_authorized());
}

#[tokio::test]
async fn test_duplicate_pending_refused_both_directions() {
    let (_store, lifecycle) = setup();

    lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let err = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap_err();
    assert!(err.is_already_pending());

    // The reverse direction hits the same row.
    let err = lifecycle
        .send_request(user("bob"), user("alice"), how_met(), ConnectionType::OnePointFive)
        .await
        .unwrap_err();
    assert!(err.is_already_pending());
}

#[tokio::test]
async fn test_send_to_connected_pair_refused() {
    let (_store, lifecycle) = setup();
    connect_first(&lifecycle, "alice", "bob").await;

    let err = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn test_resend_after_rejection_allowed() {
    let (_store, lifecycle) = setup();

    let first = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    lifecycle.reject_request(first.id, &user("bob")).await.unwrap();

    // Rejection is terminal for the row, not for the pair.
    let second = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::OnePointFive)
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.status, ConnectionStatus::Pending);

    // Still one row for the pair.
    let between = lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(between.id, second.id);
}

// ============================================================================
// Accepting
// ============================================================================

#[tokio::test]
async fn test_accept_transitions_to_accepted() {
    let (_store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    let accepted = lifecycle.accept_request(edge.id, &user("bob")).await.unwrap();

    assert_eq!(accepted.status, ConnectionStatus::Accepted);
    assert_eq!(accepted.connection_type, ConnectionType::First);

    let stored = lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ConnectionStatus::Accepted);
}

#[tokio::test]
async fn test_only_recipient_can_accept() {
    let (_store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let err = lifecycle.accept_request(edge.id, &user("alice")).await.unwrap_err();
    assert!(err.is_not_authorized());

    let err = lifecycle.accept_request(edge.id, &user("carol")).await.unwrap_err();
    assert!(err.is_not_authorized());
}

#[tokio::test]
async fn test_accept_non_pending_refused() {
    let (_store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    lifecycle.accept_request(edge.id, &user("bob")).await.unwrap();

    let err = lifecycle.accept_request(edge.id, &user("bob")).await.unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn test_accept_missing_connection_not_found() {
    let (_store, lifecycle) = setup();

    let err = lifecycle
        .accept_request(tierlink::ConnectionId::new(), &user("bob"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ============================================================================
// Rejecting and cancelling
// ============================================================================

#[tokio::test]
async fn test_reject_retains_row() {
    let (store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    lifecycle.reject_request(edge.id, &user("bob")).await.unwrap();

    let stored = lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ConnectionStatus::Rejected);
    assert_eq!(store.row_count(), 1);
}

#[tokio::test]
async fn test_only_recipient_can_reject() {
    let (_store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let err = lifecycle.reject_request(edge.id, &user("alice")).await.unwrap_err();
    assert!(err.is_not_authorized());
}

#[tokio::test]
async fn test_cancel_deletes_row() {
    let (store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    lifecycle.cancel_request(edge.id, &user("alice")).await.unwrap();

    assert_eq!(store.row_count(), 0);
    assert!(lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_only_requester_can_cancel() {
    let (_store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let err = lifecycle.cancel_request(edge.id, &user("bob")).await.unwrap_err();
    assert!(err.is_not_authorized());
}

// ============================================================================
// Deleting accepted connections
// ============================================================================

#[tokio::test]
async fn test_either_endpoint_can_delete() {
    let (store, lifecycle) = setup();
    connect_first(&lifecycle, "alice", "bob").await;

    let edge = lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    lifecycle.delete_connection(edge.id, &user("alice")).await.unwrap();
    assert_eq!(store.row_count(), 0);

    connect_first(&lifecycle, "alice", "bob").await;
    let edge = lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    lifecycle.delete_connection(edge.id, &user("bob")).await.unwrap();
    assert_eq!(store.row_count(), 0);
}

#[tokio::test]
async fn test_delete_pending_refused() {
    let (_store, lifecycle) = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let err = lifecycle.delete_connection(edge.id, &user("alice")).await.unwrap_err();
    assert!(err.is_invalid_state());
}

#[tokio::test]
async fn test_stranger_cannot_delete() {
    let (_store, lifecycle) = setup();
    connect_first(&lifecycle, "alice", "bob").await;

    let edge = lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    let err = lifecycle.delete_connection(edge.id, &user("mallory")).await.unwrap_err();
    assert!(err.is_not_authorized());
}

// ============================================================================
// First-connection quota
// ============================================================================

#[tokio::test]
async fn test_send_quota_enforced_at_cap() {
    let (_store, lifecycle) = setup();

    // The 100th send happens while alice holds 99 accepted firsts and
    // must succeed; the 101st is refused.
    for i in 0..MAX_FIRST_CONNECTIONS {
        connect_first(&lifecycle, "alice", &format!("peer-{i}")).await;
    }

    let err = lifecycle
        .send_request(user("alice"), user("one-more"), how_met(), ConnectionType::First)
        .await
        .unwrap_err();
    assert!(err.is_quota_exceeded());

    // The weaker tier is unlimited.
    lifecycle
        .send_request(user("alice"), user("one-more"), how_met(), ConnectionType::OnePointFive)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_accept_quota_enforced_for_accepter() {
    let (_store, lifecycle) = setup();

    for i in 0..MAX_FIRST_CONNECTIONS {
        connect_first(&lifecycle, "bob", &format!("peer-{i}")).await;
    }

    // Alice can still send; the cap bites bob on accept.
    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    let err = lifecycle.accept_request(edge.id, &user("bob")).await.unwrap_err();
    assert!(err.is_quota_exceeded());

    // The request is still pending; bob could counter at the weaker tier.
    let stored = lifecycle
        .connection_between(&user("alice"), &user("bob"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ConnectionStatus::Pending);
}

#[tokio::test]
async fn test_one_point_five_does_not_count_toward_quota() {
    let (_store, lifecycle) = setup();

    for i in 0..MAX_FIRST_CONNECTIONS {
        let edge = lifecycle
            .send_request(
                user("alice"),
                user(&format!("peer-{i}")),
                how_met(),
                ConnectionType::OnePointFive,
            )
            .await
            .unwrap();
        lifecycle
            .accept_request(edge.id, &user(&format!("peer-{i}")))
            .await
            .unwrap();
    }

    // A hundred weak ties later, a first request still goes through.
    lifecycle
        .send_request(user("alice"), user("bestie"), how_met(), ConnectionType::First)
        .await
        .unwrap();
}
