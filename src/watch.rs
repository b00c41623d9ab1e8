//! In-process notification of connection lifecycle changes.
//!
//! Every successful [`ConnectionLifecycle`](crate::ConnectionLifecycle)
//! mutation publishes a [`ConnectionEvent`]. Delivery is best-effort and
//! bounded: a subscriber that falls behind loses events rather than
//! blocking the mutation path, and nothing in the crate depends on
//! delivery for correctness — the graph explorer merely uses events to
//! re-arm nodes for refetching.
//!
//! Subscriptions are plain crossbeam receivers with an async adapter:
//! [`EventSubscription`] implements [`futures_core::Stream`], bridging the
//! sync channel to async consumers through an [`AtomicWaker`].

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use atomic_waker::AtomicWaker;
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tracing::trace;

use crate::connection::types::ConnectionEdge;
use crate::types::{ConnectionId, UserId};

/// Per-subscriber buffer capacity.
///
/// Sized for bursts of UI-driven mutations; a subscriber this far behind
/// is better served by a fresh snapshot than by the backlog.
const EVENT_BUFFER_SIZE: usize = 256;

/// What happened to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    /// A new pending request was created.
    RequestSent,
    /// A pending request became accepted.
    RequestAccepted,
    /// A pending request became rejected.
    RequestRejected,
    /// A pending request was cancelled (row deleted).
    RequestCancelled,
    /// A pending request's terms were amended by the requester.
    RequestAmended,
    /// A pending request's terms were countered by the recipient.
    RequestCountered,
    /// A tier upgrade was proposed on an accepted connection.
    UpgradeRequested,
    /// A proposed tier upgrade was accepted.
    UpgradeAccepted,
    /// A proposed tier upgrade was rejected.
    UpgradeRejected,
    /// A proposed tier upgrade was withdrawn by its proposer.
    UpgradeCancelled,
    /// An accepted connection was downgraded to the weaker tier.
    Downgraded,
    /// An accepted connection was deleted.
    ConnectionDeleted,
}

/// A lifecycle change notification.
#[derive(Clone, Debug)]
pub struct ConnectionEvent {
    /// What happened.
    pub kind: ConnectionEventKind,

    /// The affected connection row.
    pub connection_id: ConnectionId,

    /// Both endpoints of the affected connection.
    pub parties: [UserId; 2],
}

impl ConnectionEvent {
    pub(crate) fn new(kind: ConnectionEventKind, edge: &ConnectionEdge) -> Self {
        Self {
            kind,
            connection_id: edge.id,
            parties: [edge.requester_id.clone(), edge.recipient_id.clone()],
        }
    }

    /// Returns true if the given user is one of the affected endpoints.
    pub fn involves(&self, user: &UserId) -> bool {
        self.parties.iter().any(|p| p == user)
    }
}

struct SubscriberHandle {
    sender: Sender<ConnectionEvent>,
    waker: Arc<AtomicWaker>,
}

/// Fan-out hub owned by the lifecycle.
#[derive(Default)]
pub(crate) struct EventBus {
    subscribers: Mutex<Vec<SubscriberHandle>>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber with its own bounded buffer.
    pub(crate) fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = crossbeam_channel::bounded(EVENT_BUFFER_SIZE);
        let waker = Arc::new(AtomicWaker::new());
        self.lock().push(SubscriberHandle {
            sender,
            waker: Arc::clone(&waker),
        });
        EventSubscription { receiver, waker }
    }

    /// Delivers an event to every live subscriber.
    ///
    /// A full buffer drops the event for that subscriber only; a
    /// disconnected receiver is pruned.
    pub(crate) fn publish(&self, event: ConnectionEvent) {
        trace!(kind = ?event.kind, connection = %event.connection_id, "publishing event");
        self.lock().retain(|sub| {
            match sub.sender.try_send(event.clone()) {
                Ok(()) => {
                    sub.waker.wake();
                    true
                }
                Err(TrySendError::Full(_)) => {
                    trace!(kind = ?event.kind, "subscriber buffer full, event dropped");
                    sub.waker.wake();
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            }
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<SubscriberHandle>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        // Wake pending consumers so their streams observe the hang-up.
        for sub in self.lock().iter() {
            sub.waker.wake();
        }
    }
}

/// A live event subscription.
///
/// Consume synchronously with [`try_next`](Self::try_next) or
/// asynchronously as a [`futures_core::Stream`]. The stream ends when the
/// owning lifecycle is dropped.
pub struct EventSubscription {
    receiver: Receiver<ConnectionEvent>,
    waker: Arc<AtomicWaker>,
}

impl EventSubscription {
    /// Returns the next buffered event without waiting.
    pub fn try_next(&self) -> Option<ConnectionEvent> {
        self.receiver.try_recv().ok()
    }
}

impl futures_core::Stream for EventSubscription {
    type Item = ConnectionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.receiver.try_recv() {
            Ok(event) => Poll::Ready(Some(event)),
            Err(TryRecvError::Disconnected) => Poll::Ready(None),
            Err(TryRecvError::Empty) => {
                self.waker.register(cx.waker());
                // Re-check after registering to close the race with a
                // publish that happened between try_recv and register.
                match self.receiver.try_recv() {
                    Ok(event) => Poll::Ready(Some(event)),
                    Err(TryRecvError::Disconnected) => Poll::Ready(None),
                    Err(TryRecvError::Empty) => Poll::Pending,
                }
            }
        }
    }
}
