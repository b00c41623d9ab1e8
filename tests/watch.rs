//! Integration tests for lifecycle event delivery.
//!
//! Every successful mutation publishes exactly one event; failed
//! mutations publish nothing. Subscribers consume synchronously via
//! try_next or asynchronously via the Stream impl.

use std::sync::Arc;

use futures::StreamExt;
use tierlink::{
    ConnectionEventKind, ConnectionLifecycle, ConnectionType, HowMet, MemoryStore, UserId,
};

fn user(id: &str) -> UserId {
    UserId::new(id)
}

fn how_met() -> HowMet {
    HowMet::new("Met at a conference", Some(2019)).unwrap()
}

fn setup() -> ConnectionLifecycle {
    ConnectionLifecycle::new(Arc::new(MemoryStore::new()))
}

#[tokio::test]
async fn test_full_negotiation_emits_events_in_order() {
    let lifecycle = setup();
    let events = lifecycle.subscribe();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::OnePointFive)
        .await
        .unwrap();
    lifecycle
        .counter_request(edge.id, &user("bob"), how_met(), None)
        .await
        .unwrap();
    // After the counter, alice is the recipient.
    lifecycle.accept_request(edge.id, &user("alice")).await.unwrap();
    lifecycle.request_type_upgrade(edge.id, &user("bob")).await.unwrap();
    lifecycle.accept_type_upgrade(edge.id, &user("alice")).await.unwrap();
    lifecycle.downgrade_type(edge.id, &user("alice")).await.unwrap();
    lifecycle.delete_connection(edge.id, &user("bob")).await.unwrap();

    let kinds: Vec<ConnectionEventKind> =
        std::iter::from_fn(|| events.try_next().map(|e| e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ConnectionEventKind::RequestSent,
            ConnectionEventKind::RequestCountered,
            ConnectionEventKind::RequestAccepted,
            ConnectionEventKind::UpgradeRequested,
            ConnectionEventKind::UpgradeAccepted,
            ConnectionEventKind::Downgraded,
            ConnectionEventKind::ConnectionDeleted,
        ]
    );
}

#[tokio::test]
async fn test_event_carries_connection_and_parties() {
    let lifecycle = setup();
    let events = lifecycle.subscribe();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let event = events.try_next().unwrap();
    assert_eq!(event.kind, ConnectionEventKind::RequestSent);
    assert_eq!(event.connection_id, edge.id);
    assert!(event.involves(&user("alice")));
    assert!(event.involves(&user("bob")));
}

#[tokio::test]
async fn test_failed_mutation_emits_nothing() {
    let lifecycle = setup();
    let events = lifecycle.subscribe();

    // Self-request fails validation before any store write.
    let _ = lifecycle
        .send_request(user("alice"), user("alice"), how_met(), ConnectionType::First)
        .await
        .unwrap_err();

    // Accepting a nonexistent connection fails too.
    let _ = lifecycle
        .accept_request(tierlink::ConnectionId::new(), &user("bob"))
        .await
        .unwrap_err();

    assert!(events.try_next().is_none());
}

#[tokio::test]
async fn test_rejected_and_cancelled_events() {
    let lifecycle = setup();
    let events = lifecycle.subscribe();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    lifecycle.reject_request(edge.id, &user("bob")).await.unwrap();

    let edge2 = lifecycle
        .send_request(user("alice"), user("carol"), how_met(), ConnectionType::First)
        .await
        .unwrap();
    lifecycle.cancel_request(edge2.id, &user("alice")).await.unwrap();

    let kinds: Vec<ConnectionEventKind> =
        std::iter::from_fn(|| events.try_next().map(|e| e.kind)).collect();
    assert_eq!(
        kinds,
        vec![
            ConnectionEventKind::RequestSent,
            ConnectionEventKind::RequestRejected,
            ConnectionEventKind::RequestSent,
            ConnectionEventKind::RequestCancelled,
        ]
    );
}

#[tokio::test]
async fn test_subscription_as_async_stream() {
    let lifecycle = setup();
    let mut events = lifecycle.subscribe();

    lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let event = events.next().await.unwrap();
    assert_eq!(event.kind, ConnectionEventKind::RequestSent);

    // Dropping the lifecycle hangs up the stream.
    drop(lifecycle);
    assert!(events.next().await.is_none());
}

#[tokio::test]
async fn test_late_subscriber_sees_only_new_events() {
    let lifecycle = setup();

    let edge = lifecycle
        .send_request(user("alice"), user("bob"), how_met(), ConnectionType::First)
        .await
        .unwrap();

    let events = lifecycle.subscribe();
    lifecycle.accept_request(edge.id, &user("bob")).await.unwrap();

    let event = events.try_next().unwrap();
    assert_eq!(event.kind, ConnectionEventKind::RequestAccepted);
    assert!(events.try_next().is_none());
}
