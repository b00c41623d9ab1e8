//! Connection lifecycle module.
//!
//! A **connection** is a tiered relationship between two users, negotiated
//! through a request/accept cycle and mutated in place afterwards. This
//! module owns the full state machine:
//!
//! ```text
//! pending --accept--> accepted --delete--> (gone)
//!    |--reject--> rejected (terminal, row retained)
//!    |--cancel--> (gone)
//! ```
//!
//! While pending, the terms (how-met text, proposed tier) can be amended
//! by the requester or countered by the recipient; a counter swaps the
//! offering roles on the same row. Once accepted, an upgrade to the
//! stronger tier needs both endpoints; a downgrade is unilateral.
//!
//! # Operations
//!
//! All operations are available on [`ConnectionLifecycle`]:
//!
//! - [`send_request`](ConnectionLifecycle::send_request)
//! - [`accept_request`](ConnectionLifecycle::accept_request)
//! - [`reject_request`](ConnectionLifecycle::reject_request)
//! - [`cancel_request`](ConnectionLifecycle::cancel_request)
//! - [`amend_request`](ConnectionLifecycle::amend_request)
//! - [`counter_request`](ConnectionLifecycle::counter_request)
//! - [`request_type_upgrade`](ConnectionLifecycle::request_type_upgrade)
//! - [`accept_type_upgrade`](ConnectionLifecycle::accept_type_upgrade)
//! - [`reject_type_upgrade`](ConnectionLifecycle::reject_type_upgrade)
//! - [`cancel_type_upgrade_request`](ConnectionLifecycle::cancel_type_upgrade_request)
//! - [`downgrade_type`](ConnectionLifecycle::downgrade_type)
//! - [`delete_connection`](ConnectionLifecycle::delete_connection)
//!
//! # Constraints
//!
//! - At most one row exists per unordered user pair
//! - `first` connections are capped at [`MAX_FIRST_CONNECTIONS`] per user
//! - Upgrade proposals exist only on accepted `one_point_five` edges
//! - A rejected row is terminal; a fresh request supersedes it

pub mod how_met;
pub mod types;

pub use how_met::HowMet;
pub use types::{
    ConnectionChanges, ConnectionEdge, ConnectionRequest, ConnectionStatus, ConnectionType,
    ResolvedConnection, UpgradeRequest,
};

use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::{NotFoundError, Result, TierlinkError};
use crate::store::ConnectionStore;
use crate::types::{ConnectionId, Timestamp, UserId};
use crate::watch::{ConnectionEvent, ConnectionEventKind, EventBus, EventSubscription};

/// Cap on accepted `first` connections per user.
///
/// This is a soft cap: the count check and the committing write are two
/// separate store round trips, so concurrent accepts can transiently
/// overshoot. The product treats the limit as a guideline for users, not
/// a safety invariant.
pub const MAX_FIRST_CONNECTIONS: usize = 100;

/// The relationship state machine over a [`ConnectionStore`].
///
/// Validates and applies every connection transition, enforcing quotas
/// and type-negotiation rules. Also the read path for the graph explorer,
/// and the publisher of [`ConnectionEvent`]s.
///
/// # Ownership
///
/// The lifecycle shares its store behind an `Arc` and is itself cheap to
/// share: construct once per session, clone the `Arc` into whatever needs
/// it.
pub struct ConnectionLifecycle {
    store: Arc<dyn ConnectionStore>,
    events: EventBus,
}

impl std::fmt::Debug for ConnectionLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionLifecycle").finish_non_exhaustive()
    }
}

impl ConnectionLifecycle {
    /// Creates a lifecycle over the given store.
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self {
            store,
            events: EventBus::new(),
        }
    }

    /// Subscribes to lifecycle change events.
    ///
    /// Delivery is best-effort (see the [`watch`](crate::watch) module);
    /// nothing here depends on subscribers keeping up.
    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    // =========================================================================
    // Request negotiation
    // =========================================================================

    /// Sends a connection request, creating a pending row.
    ///
    /// # Errors
    ///
    /// - `Validation` if requester and recipient are the same user
    /// - `NotAuthorized` if either user has blocked the other
    /// - `AlreadyPending` if a pending row already exists for the pair
    /// - `InvalidState` if the pair is already connected
    /// - `QuotaExceeded` if proposing `first` and the requester is at cap
    #[instrument(skip(self, how_met))]
    pub async fn send_request(
        &self,
        requester: UserId,
        recipient: UserId,
        how_met: HowMet,
        connection_type: ConnectionType,
    ) -> Result<ConnectionEdge> {
        if requester == recipient {
            return Err(crate::error::ValidationError::invalid_field(
                "recipient_id",
                "cannot send a connection request to yourself",
            )
            .into());
        }

        if self.store.is_blocked(&requester, &recipient).await? {
            return Err(TierlinkError::not_authorized(
                requester,
                "connect with this user",
            ));
        }

        if let Some(existing) = self.store.get_connection(&requester, &recipient).await? {
            match existing.status {
                ConnectionStatus::Pending => {
                    return Err(TierlinkError::already_pending(
                        existing.requester_id,
                        existing.recipient_id,
                    ));
                }
                ConnectionStatus::Accepted => {
                    return Err(TierlinkError::invalid_state(format!(
                        "'{}' and '{}' are already connected",
                        requester, recipient
                    )));
                }
                // Terminal but not blocking: a fresh request supersedes it.
                ConnectionStatus::Rejected => {}
            }
        }

        if connection_type == ConnectionType::First {
            self.ensure_first_quota(&requester).await?;
        }

        let edge = self
            .store
            .create_connection(ConnectionRequest {
                requester_id: requester,
                recipient_id: recipient,
                connection_type,
                how_met,
            })
            .await?;

        info!(connection = %edge.id, "connection request sent");
        self.publish(ConnectionEventKind::RequestSent, &edge);
        Ok(edge)
    }

    /// Accepts a pending request. Only the recipient may accept.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` if the pending tier is `first` and the accepter is
    /// at cap; `NotFound`/`NotAuthorized`/`InvalidState` per the usual
    /// rules.
    #[instrument(skip(self))]
    pub async fn accept_request(
        &self,
        id: ConnectionId,
        accepter: &UserId,
    ) -> Result<ConnectionEdge> {
        let edge = self.require_edge(id).await?;
        ensure_pending(&edge)?;

        if &edge.recipient_id != accepter {
            return Err(TierlinkError::not_authorized(
                accepter.clone(),
                "accept this request",
            ));
        }

        if edge.connection_type == ConnectionType::First {
            self.ensure_first_quota(accepter).await?;
        }

        self.store
            .update_connection_status(id, ConnectionStatus::Accepted)
            .await?;

        let mut updated = edge;
        updated.status = ConnectionStatus::Accepted;
        updated.updated_at = Timestamp::now();

        info!(connection = %id, "connection request accepted");
        self.publish(ConnectionEventKind::RequestAccepted, &updated);
        Ok(updated)
    }

    /// Rejects a pending request. Only the recipient may reject.
    ///
    /// The row is retained in `rejected` status, not deleted.
    #[instrument(skip(self))]
    pub async fn reject_request(&self, id: ConnectionId, rejecter: &UserId) -> Result<()> {
        let edge = self.require_edge(id).await?;
        ensure_pending(&edge)?;

        if &edge.recipient_id != rejecter {
            return Err(TierlinkError::not_authorized(
                rejecter.clone(),
                "reject this request",
            ));
        }

        self.store
            .update_connection_status(id, ConnectionStatus::Rejected)
            .await?;

        info!(connection = %id, "connection request rejected");
        self.publish(ConnectionEventKind::RequestRejected, &edge);
        Ok(())
    }

    /// Cancels (deletes) a pending request. Only the requester may cancel.
    #[instrument(skip(self))]
    pub async fn cancel_request(&self, id: ConnectionId, canceller: &UserId) -> Result<()> {
        let edge = self.require_edge(id).await?;
        ensure_pending(&edge)?;

        if &edge.requester_id != canceller {
            return Err(TierlinkError::not_authorized(
                canceller.clone(),
                "cancel this request",
            ));
        }

        self.store.delete_connection(id).await?;

        info!(connection = %id, "connection request cancelled");
        self.publish(ConnectionEventKind::RequestCancelled, &edge);
        Ok(())
    }

    /// Amends an outgoing pending request's terms. Only the requester.
    ///
    /// Overwrites the how-met text, and optionally the proposed tier.
    /// Changing the proposal to `first` re-checks the requester's quota.
    #[instrument(skip(self, how_met))]
    pub async fn amend_request(
        &self,
        id: ConnectionId,
        requester: &UserId,
        how_met: HowMet,
        connection_type: Option<ConnectionType>,
    ) -> Result<ConnectionEdge> {
        let edge = self.require_edge(id).await?;
        ensure_pending(&edge)?;

        if &edge.requester_id != requester {
            return Err(TierlinkError::not_authorized(
                requester.clone(),
                "amend this request",
            ));
        }

        if connection_type == Some(ConnectionType::First)
            && edge.connection_type != ConnectionType::First
        {
            self.ensure_first_quota(requester).await?;
        }

        let changes = ConnectionChanges {
            how_met: Some(how_met),
            connection_type,
            ..Default::default()
        };
        self.store.update_connection_fields(id, changes.clone()).await?;

        let mut updated = edge;
        changes.apply_to(&mut updated);

        info!(connection = %id, "connection request amended");
        self.publish(ConnectionEventKind::RequestAmended, &updated);
        Ok(updated)
    }

    /// Counters a pending request. Only the recipient.
    ///
    /// Re-proposes terms on the same row and swaps the offering roles, so
    /// the pair is never represented by two rows. Proposing `first`
    /// checks the counter-offerer's quota.
    #[instrument(skip(self, how_met))]
    pub async fn counter_request(
        &self,
        id: ConnectionId,
        counter_offerer: &UserId,
        how_met: HowMet,
        connection_type: Option<ConnectionType>,
    ) -> Result<ConnectionEdge> {
        let edge = self.require_edge(id).await?;
        ensure_pending(&edge)?;

        if &edge.recipient_id != counter_offerer {
            return Err(TierlinkError::not_authorized(
                counter_offerer.clone(),
                "counter this request",
            ));
        }

        let proposed = connection_type.unwrap_or(edge.connection_type);
        if proposed == ConnectionType::First {
            self.ensure_first_quota(counter_offerer).await?;
        }

        let changes = ConnectionChanges {
            how_met: Some(how_met),
            connection_type,
            swap_parties: true,
            ..Default::default()
        };
        self.store.update_connection_fields(id, changes.clone()).await?;

        let mut updated = edge;
        changes.apply_to(&mut updated);

        info!(connection = %id, "connection request countered");
        self.publish(ConnectionEventKind::RequestCountered, &updated);
        Ok(updated)
    }

    // =========================================================================
    // Tier negotiation on accepted connections
    // =========================================================================

    /// Proposes upgrading an accepted `one_point_five` connection to
    /// `first`. Either endpoint may propose.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the edge is not accepted, not `one_point_five`,
    /// or an upgrade is already proposed.
    #[instrument(skip(self))]
    pub async fn request_type_upgrade(
        &self,
        id: ConnectionId,
        requester: &UserId,
    ) -> Result<ConnectionEdge> {
        let edge = self.require_edge(id).await?;
        ensure_accepted(&edge)?;

        if !edge.involves(requester) {
            return Err(TierlinkError::not_authorized(
                requester.clone(),
                "negotiate this connection",
            ));
        }

        if edge.connection_type != ConnectionType::OnePointFive {
            return Err(TierlinkError::invalid_state(format!(
                "only one_point_five connections can be upgraded, this one is {}",
                edge.connection_type
            )));
        }

        if edge.upgrade_pending() {
            return Err(TierlinkError::invalid_state(
                "an upgrade is already proposed for this connection",
            ));
        }

        let changes = ConnectionChanges {
            upgrade_request: Some(UpgradeRequest {
                requested_type: ConnectionType::First,
                requested_by: requester.clone(),
            }),
            ..Default::default()
        };
        self.store.update_connection_fields(id, changes.clone()).await?;

        let mut updated = edge;
        changes.apply_to(&mut updated);

        info!(connection = %id, "tier upgrade requested");
        self.publish(ConnectionEventKind::UpgradeRequested, &updated);
        Ok(updated)
    }

    /// Accepts a proposed tier upgrade.
    ///
    /// Only the endpoint that did *not* propose may accept, and their
    /// `first` quota is checked — the edge was accepted at the weaker
    /// tier, so this is where the cap bites.
    #[instrument(skip(self))]
    pub async fn accept_type_upgrade(
        &self,
        id: ConnectionId,
        accepter: &UserId,
    ) -> Result<ConnectionEdge> {
        let edge = self.require_edge(id).await?;
        let upgrade = self.require_upgrade(&edge)?;

        self.ensure_counterparty(&edge, &upgrade, accepter, "accept this upgrade")?;
        self.ensure_first_quota(accepter).await?;

        let changes = ConnectionChanges {
            connection_type: Some(upgrade.requested_type),
            clear_upgrade_request: true,
            ..Default::default()
        };
        self.store.update_connection_fields(id, changes.clone()).await?;

        let mut updated = edge;
        changes.apply_to(&mut updated);

        info!(connection = %id, "tier upgrade accepted");
        self.publish(ConnectionEventKind::UpgradeAccepted, &updated);
        Ok(updated)
    }

    /// Rejects a proposed tier upgrade; the tier is unchanged.
    ///
    /// Only the endpoint that did not propose may reject.
    #[instrument(skip(self))]
    pub async fn reject_type_upgrade(&self, id: ConnectionId, rejecter: &UserId) -> Result<()> {
        let edge = self.require_edge(id).await?;
        let upgrade = self.require_upgrade(&edge)?;

        self.ensure_counterparty(&edge, &upgrade, rejecter, "reject this upgrade")?;

        let changes = ConnectionChanges {
            clear_upgrade_request: true,
            ..Default::default()
        };
        self.store.update_connection_fields(id, changes).await?;

        info!(connection = %id, "tier upgrade rejected");
        self.publish(ConnectionEventKind::UpgradeRejected, &edge);
        Ok(())
    }

    /// Withdraws a proposed tier upgrade. Only the proposer may withdraw.
    #[instrument(skip(self))]
    pub async fn cancel_type_upgrade_request(
        &self,
        id: ConnectionId,
        canceller: &UserId,
    ) -> Result<()> {
        let edge = self.require_edge(id).await?;
        let upgrade = self.require_upgrade(&edge)?;

        if &upgrade.requested_by != canceller {
            return Err(TierlinkError::not_authorized(
                canceller.clone(),
                "withdraw this upgrade proposal",
            ));
        }

        let changes = ConnectionChanges {
            clear_upgrade_request: true,
            ..Default::default()
        };
        self.store.update_connection_fields(id, changes).await?;

        info!(connection = %id, "tier upgrade withdrawn");
        self.publish(ConnectionEventKind::UpgradeCancelled, &edge);
        Ok(())
    }

    /// Unilaterally downgrades an accepted `first` connection to
    /// `one_point_five`. Either endpoint; no counterpart approval.
    ///
    /// Any stray upgrade proposal is cleared with the same write.
    #[instrument(skip(self))]
    pub async fn downgrade_type(&self, id: ConnectionId, actor: &UserId) -> Result<ConnectionEdge> {
        let edge = self.require_edge(id).await?;
        ensure_accepted(&edge)?;

        if !edge.involves(actor) {
            return Err(TierlinkError::not_authorized(
                actor.clone(),
                "negotiate this connection",
            ));
        }

        if edge.connection_type != ConnectionType::First {
            return Err(TierlinkError::invalid_state(format!(
                "only first connections can be downgraded, this one is {}",
                edge.connection_type
            )));
        }

        let changes = ConnectionChanges {
            connection_type: Some(ConnectionType::OnePointFive),
            clear_upgrade_request: true,
            ..Default::default()
        };
        self.store.update_connection_fields(id, changes.clone()).await?;

        let mut updated = edge;
        changes.apply_to(&mut updated);

        info!(connection = %id, "connection downgraded");
        self.publish(ConnectionEventKind::Downgraded, &updated);
        Ok(updated)
    }

    /// Deletes an accepted connection entirely. Either endpoint.
    #[instrument(skip(self))]
    pub async fn delete_connection(&self, id: ConnectionId, actor: &UserId) -> Result<()> {
        let edge = self.require_edge(id).await?;
        ensure_accepted(&edge)?;

        if !edge.involves(actor) {
            return Err(TierlinkError::not_authorized(
                actor.clone(),
                "delete this connection",
            ));
        }

        self.store.delete_connection(id).await?;

        info!(connection = %id, "connection deleted");
        self.publish(ConnectionEventKind::ConnectionDeleted, &edge);
        Ok(())
    }

    // =========================================================================
    // Read path (used by the graph explorer)
    // =========================================================================

    /// Returns all accepted connections involving the user, with resolved
    /// counterpart identities.
    pub async fn accepted_connections(&self, user: &UserId) -> Result<Vec<ResolvedConnection>> {
        self.store.get_accepted_connections(user).await
    }

    /// Returns all pending requests involving the user (incoming and
    /// outgoing), with resolved counterpart identities.
    pub async fn pending_requests(&self, user: &UserId) -> Result<Vec<ResolvedConnection>> {
        self.store.get_pending_connections(user).await
    }

    /// Returns the connection between two users, any status.
    pub async fn connection_between(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<ConnectionEdge>> {
        self.store.get_connection(a, b).await
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    async fn require_edge(&self, id: ConnectionId) -> Result<ConnectionEdge> {
        self.store
            .get_connection_by_id(id)
            .await?
            .ok_or_else(|| NotFoundError::connection(id).into())
    }

    fn require_upgrade(&self, edge: &ConnectionEdge) -> Result<UpgradeRequest> {
        ensure_accepted(edge)?;
        edge.upgrade_request
            .clone()
            .ok_or_else(|| TierlinkError::invalid_state("no upgrade is proposed for this connection"))
    }

    fn ensure_counterparty(
        &self,
        edge: &ConnectionEdge,
        upgrade: &UpgradeRequest,
        actor: &UserId,
        action: &str,
    ) -> Result<()> {
        if !edge.involves(actor) || &upgrade.requested_by == actor {
            return Err(TierlinkError::not_authorized(actor.clone(), action));
        }
        Ok(())
    }

    /// Check-then-act quota gate for `first` connections.
    ///
    /// Not transactional: two writers can both pass before either commits.
    async fn ensure_first_quota(&self, user: &UserId) -> Result<()> {
        let count = self.store.count_first_connections(user).await?;
        if count >= MAX_FIRST_CONNECTIONS {
            return Err(TierlinkError::quota_exceeded(
                user.clone(),
                MAX_FIRST_CONNECTIONS,
            ));
        }
        Ok(())
    }

    fn publish(&self, kind: ConnectionEventKind, edge: &ConnectionEdge) {
        self.events.publish(ConnectionEvent::new(kind, edge));
    }
}

fn ensure_pending(edge: &ConnectionEdge) -> Result<()> {
    if !edge.is_pending() {
        return Err(TierlinkError::invalid_state(format!(
            "connection is {}, expected pending",
            edge.status
        )));
    }
    Ok(())
}

fn ensure_accepted(edge: &ConnectionEdge) -> Result<()> {
    if !edge.is_accepted() {
        return Err(TierlinkError::invalid_state(format!(
            "connection is {}, expected accepted",
            edge.status
        )));
    }
    Ok(())
}
