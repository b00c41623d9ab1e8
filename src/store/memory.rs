//! In-memory connection store.
//!
//! The reference [`ConnectionStore`] backend: a `HashMap` of rows behind a
//! mutex. Used by the test suite, benches, and doc examples; also a
//! readable specification of the row-level invariants a real backend must
//! uphold (one row per pair, rejected rows superseded on re-request).

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::connection::types::{
    ConnectionChanges, ConnectionEdge, ConnectionRequest, ConnectionStatus, ConnectionType,
    ResolvedConnection,
};
use crate::error::{NotFoundError, Result, TierlinkError};
use crate::store::ConnectionStore;
use crate::types::{ConnectionId, Timestamp, UserId, UserProfile};

/// In-memory store of connection rows, user profiles, and block pairs.
///
/// Profiles are optional: a connection involving an unregistered user is
/// resolved with a placeholder profile rather than failing, since the
/// store contract promises an identity for every returned row.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    edges: HashMap<ConnectionId, ConnectionEdge>,
    profiles: HashMap<UserId, UserProfile>,
    /// Blocked pairs, stored smaller-id-first.
    blocks: HashSet<(UserId, UserId)>,
}

fn pair_key(a: &UserId, b: &UserId) -> (UserId, UserId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a user profile for identity resolution.
    pub fn register_profile(&self, profile: UserProfile) {
        self.lock().profiles.insert(profile.id.clone(), profile);
    }

    /// Sets or clears a block between two users.
    pub fn set_blocked(&self, a: &UserId, b: &UserId, blocked: bool) {
        let key = pair_key(a, b);
        let mut inner = self.lock();
        if blocked {
            inner.blocks.insert(key);
        } else {
            inner.blocks.remove(&key);
        }
    }

    /// Number of rows currently stored, any status.
    pub fn row_count(&self) -> usize {
        self.lock().edges.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-write;
        // the map itself is still structurally sound.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(inner: &Inner, edge: &ConnectionEdge, user: &UserId) -> ResolvedConnection {
        let other = edge
            .other_party(user)
            .cloned()
            .unwrap_or_else(|| edge.recipient_id.clone());
        let other_party = inner
            .profiles
            .get(&other)
            .cloned()
            .unwrap_or_else(|| UserProfile::bare(other));
        ResolvedConnection {
            edge: edge.clone(),
            other_party,
        }
    }

    fn connections_with_status(
        &self,
        user: &UserId,
        status: ConnectionStatus,
    ) -> Vec<ResolvedConnection> {
        let inner = self.lock();
        let mut found: Vec<ResolvedConnection> = inner
            .edges
            .values()
            .filter(|e| e.status == status && e.involves(user))
            .map(|e| Self::resolve(&inner, e, user))
            .collect();
        found.sort_by_key(|c| (c.edge.created_at, c.edge.id));
        found
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn get_connection(&self, a: &UserId, b: &UserId) -> Result<Option<ConnectionEdge>> {
        let key = pair_key(a, b);
        let inner = self.lock();
        Ok(inner
            .edges
            .values()
            .find(|e| e.pair_key() == key)
            .cloned())
    }

    async fn get_connection_by_id(&self, id: ConnectionId) -> Result<Option<ConnectionEdge>> {
        Ok(self.lock().edges.get(&id).cloned())
    }

    async fn get_accepted_connections(&self, user: &UserId) -> Result<Vec<ResolvedConnection>> {
        Ok(self.connections_with_status(user, ConnectionStatus::Accepted))
    }

    async fn get_pending_connections(&self, user: &UserId) -> Result<Vec<ResolvedConnection>> {
        Ok(self.connections_with_status(user, ConnectionStatus::Pending))
    }

    async fn create_connection(&self, request: ConnectionRequest) -> Result<ConnectionEdge> {
        let key = pair_key(&request.requester_id, &request.recipient_id);
        let mut inner = self.lock();

        // One row per unordered pair: a rejected row is superseded by the
        // fresh request, anything else refuses the create.
        if let Some(existing) = inner.edges.values().find(|e| e.pair_key() == key) {
            match existing.status {
                ConnectionStatus::Pending => {
                    return Err(TierlinkError::already_pending(
                        existing.requester_id.clone(),
                        existing.recipient_id.clone(),
                    ));
                }
                ConnectionStatus::Accepted => {
                    return Err(TierlinkError::invalid_state(format!(
                        "'{}' and '{}' are already connected",
                        request.requester_id, request.recipient_id
                    )));
                }
                ConnectionStatus::Rejected => {
                    let superseded = existing.id;
                    inner.edges.remove(&superseded);
                    debug!(connection = %superseded, "superseded rejected row");
                }
            }
        }

        let now = Timestamp::now();
        let edge = ConnectionEdge {
            id: ConnectionId::new(),
            requester_id: request.requester_id,
            recipient_id: request.recipient_id,
            status: ConnectionStatus::Pending,
            connection_type: request.connection_type,
            how_met: request.how_met,
            upgrade_request: None,
            created_at: now,
            updated_at: now,
        };
        inner.edges.insert(edge.id, edge.clone());
        Ok(edge)
    }

    async fn update_connection_status(
        &self,
        id: ConnectionId,
        status: ConnectionStatus,
    ) -> Result<()> {
        let mut inner = self.lock();
        let edge = inner
            .edges
            .get_mut(&id)
            .ok_or_else(|| NotFoundError::connection(id))?;
        edge.status = status;
        edge.updated_at = Timestamp::now();
        Ok(())
    }

    async fn update_connection_fields(
        &self,
        id: ConnectionId,
        changes: ConnectionChanges,
    ) -> Result<()> {
        let mut inner = self.lock();
        let edge = inner
            .edges
            .get_mut(&id)
            .ok_or_else(|| NotFoundError::connection(id))?;
        changes.apply_to(edge);
        Ok(())
    }

    async fn delete_connection(&self, id: ConnectionId) -> Result<()> {
        let mut inner = self.lock();
        inner
            .edges
            .remove(&id)
            .ok_or_else(|| NotFoundError::connection(id))?;
        Ok(())
    }

    async fn count_first_connections(&self, user: &UserId) -> Result<usize> {
        let inner = self.lock();
        Ok(inner
            .edges
            .values()
            .filter(|e| {
                e.status == ConnectionStatus::Accepted
                    && e.connection_type == ConnectionType::First
                    && e.involves(user)
            })
            .count())
    }

    async fn is_blocked(&self, a: &UserId, b: &UserId) -> Result<bool> {
        Ok(self.lock().blocks.contains(&pair_key(a, b)))
    }
}
