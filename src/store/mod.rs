//! Storage layer abstraction for connection rows.
//!
//! Tierlink does not implement persistence: connection rows live in an
//! external system (relational database, document store, remote service)
//! reached through the [`ConnectionStore`] trait. The crate ships one
//! implementation, [`MemoryStore`], used as the reference backend for
//! tests, benches, and examples.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │              ConnectionLifecycle                     │
//! │                       │                              │
//! │                       ▼                              │
//! │            ┌─────────────────────┐                   │
//! │            │   ConnectionStore   │  ← Trait          │
//! │            └─────────────────────┘                   │
//! │                 ▲           ▲                        │
//! │                 │           │                        │
//! │        ┌────────┴───┐  ┌────┴────────┐               │
//! │        │ MemoryStore│  │ consumer's  │               │
//! │        │  (bundled) │  │  backend    │               │
//! │        └────────────┘  └─────────────┘               │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::connection::types::{
    ConnectionChanges, ConnectionEdge, ConnectionRequest, ConnectionStatus, ResolvedConnection,
};
use crate::error::Result;
use crate::types::{ConnectionId, UserId};

/// Contract for the durable connection store.
///
/// Implementations must be `Send + Sync`; the lifecycle shares one
/// instance behind an `Arc`. All failures map into
/// [`TierlinkError`](crate::TierlinkError) — transport and engine errors
/// should surface as `Upstream`.
///
/// # Consistency
///
/// The contract is deliberately transaction-free: each call is an
/// independent round trip. Quota enforcement layered on top is therefore
/// check-then-act and can transiently overshoot (see
/// [`MAX_FIRST_CONNECTIONS`](crate::MAX_FIRST_CONNECTIONS)).
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Returns the connection between two users, regardless of status.
    ///
    /// The pair is unordered: `get_connection(a, b)` and
    /// `get_connection(b, a)` return the same row. Returns `None` if no
    /// row exists for the pair.
    async fn get_connection(&self, a: &UserId, b: &UserId) -> Result<Option<ConnectionEdge>>;

    /// Returns the connection with the given id, or `None`.
    async fn get_connection_by_id(&self, id: ConnectionId) -> Result<Option<ConnectionEdge>>;

    /// Returns all `Accepted` connections involving the given user, each
    /// with the resolved identity of the opposite endpoint.
    async fn get_accepted_connections(&self, user: &UserId) -> Result<Vec<ResolvedConnection>>;

    /// Returns all `Pending` connections involving the given user
    /// (incoming and outgoing), each with the resolved identity of the
    /// opposite endpoint.
    async fn get_pending_connections(&self, user: &UserId) -> Result<Vec<ResolvedConnection>>;

    /// Creates a new `Pending` row for the request's pair.
    ///
    /// A superseded `Rejected` row for the same pair is replaced, keeping
    /// the one-row-per-pair invariant. Fails if a `Pending` or `Accepted`
    /// row already exists for the pair.
    async fn create_connection(&self, request: ConnectionRequest) -> Result<ConnectionEdge>;

    /// Sets the status of an existing row.
    async fn update_connection_status(&self, id: ConnectionId, status: ConnectionStatus)
        -> Result<()>;

    /// Applies a partial field update to an existing row.
    async fn update_connection_fields(
        &self,
        id: ConnectionId,
        changes: ConnectionChanges,
    ) -> Result<()>;

    /// Removes a row entirely.
    async fn delete_connection(&self, id: ConnectionId) -> Result<()>;

    /// Counts the user's `Accepted` connections of type `First`.
    ///
    /// Must be atomic with respect to a single read, but is not required
    /// to be serialized against concurrent writes.
    async fn count_first_connections(&self, user: &UserId) -> Result<usize>;

    /// Returns true if either user has blocked the other.
    async fn is_blocked(&self, a: &UserId, b: &UserId) -> Result<bool>;
}
