//! Data types for connection edges between users.
//!
//! A connection row is directional at creation time (requester → recipient)
//! but once accepted it is logically undirected for membership purposes:
//! either endpoint "has" the connection, and negotiation operations address
//! endpoints by role rather than by column.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::connection::how_met::HowMet;
use crate::types::{ConnectionId, Timestamp, UserId, UserProfile};

/// Strength tier of a connection.
///
/// `First` is the stronger, quota-limited tier; `OnePointFive` is the
/// weaker, unlimited tier. While a request is pending this is the
/// *proposed* strength; once accepted it is the agreed strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionType {
    /// The stronger tier, capped per user.
    First,
    /// The weaker tier, unlimited.
    OnePointFive,
}

impl ConnectionType {
    /// Canonical lowercase name, as stored and logged.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::OnePointFive => "one_point_five",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a connection row.
///
/// There is no `Deleted` variant: cancellation of a pending request and
/// disconnection of an accepted edge both remove the row entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Proposed, awaiting the recipient's decision.
    Pending,
    /// Agreed by both endpoints.
    Accepted,
    /// Declined by the recipient; terminal, row retained.
    Rejected,
}

impl ConnectionStatus {
    /// Canonical lowercase name, as stored and logged.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending proposal to change an accepted connection's tier.
///
/// Both fields live and die together; modeling them as one struct inside
/// an `Option` makes a half-set pair unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    /// The tier being proposed (always `First` today).
    pub requested_type: ConnectionType,

    /// Which endpoint initiated the proposal.
    pub requested_by: UserId,
}

/// A durable relationship record between two users.
///
/// # Uniqueness
///
/// At most one edge exists per unordered pair of users at any time.
/// Counter-offers mutate this row rather than creating a second one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionEdge {
    /// Unique identifier for this connection.
    pub id: ConnectionId,

    /// The endpoint that sent (or, after a counter, currently offers)
    /// the proposal.
    pub requester_id: UserId,

    /// The endpoint the proposal is addressed to.
    pub recipient_id: UserId,

    /// Current lifecycle status.
    pub status: ConnectionStatus,

    /// Agreed strength once accepted, proposed strength while pending.
    pub connection_type: ConnectionType,

    /// How the two users met.
    pub how_met: HowMet,

    /// Pending tier-upgrade proposal, only meaningful while the edge is
    /// accepted at `OnePointFive`.
    pub upgrade_request: Option<UpgradeRequest>,

    /// When this row was created.
    pub created_at: Timestamp,

    /// When this row was last mutated.
    pub updated_at: Timestamp,
}

impl ConnectionEdge {
    /// Returns true if the given user is one of the two endpoints.
    pub fn involves(&self, user: &UserId) -> bool {
        &self.requester_id == user || &self.recipient_id == user
    }

    /// Returns the endpoint opposite the given user, or `None` if the
    /// user is not a party to this connection.
    pub fn other_party(&self, user: &UserId) -> Option<&UserId> {
        if &self.requester_id == user {
            Some(&self.recipient_id)
        } else if &self.recipient_id == user {
            Some(&self.requester_id)
        } else {
            None
        }
    }

    /// Returns the unordered endpoint pair, smaller id first.
    ///
    /// Two edges between the same users produce the same key regardless
    /// of which endpoint requested.
    pub fn pair_key(&self) -> (UserId, UserId) {
        if self.requester_id <= self.recipient_id {
            (self.requester_id.clone(), self.recipient_id.clone())
        } else {
            (self.recipient_id.clone(), self.requester_id.clone())
        }
    }

    /// Returns true if the row is awaiting the recipient's decision.
    pub fn is_pending(&self) -> bool {
        self.status == ConnectionStatus::Pending
    }

    /// Returns true if both endpoints have agreed.
    pub fn is_accepted(&self) -> bool {
        self.status == ConnectionStatus::Accepted
    }

    /// Returns true if a tier upgrade is currently proposed.
    pub fn upgrade_pending(&self) -> bool {
        self.upgrade_request.is_some()
    }
}

/// Input for creating a new pending connection.
#[derive(Clone, Debug)]
pub struct ConnectionRequest {
    /// The user sending the request.
    pub requester_id: UserId,

    /// The user the request is addressed to.
    pub recipient_id: UserId,

    /// Proposed strength tier.
    pub connection_type: ConnectionType,

    /// How the two users met.
    pub how_met: HowMet,
}

/// Partial update applied to an existing connection row.
///
/// Only `Some` fields are applied; `swap_parties` and
/// `clear_upgrade_request` are explicit flags because "set to nothing"
/// must be distinguishable from "leave alone".
#[derive(Clone, Debug, Default)]
pub struct ConnectionChanges {
    /// Replace the how-met text.
    pub how_met: Option<HowMet>,

    /// Replace the proposed/agreed tier.
    pub connection_type: Option<ConnectionType>,

    /// Exchange requester and recipient (counter-offer semantics).
    pub swap_parties: bool,

    /// Set a pending tier-upgrade proposal.
    pub upgrade_request: Option<UpgradeRequest>,

    /// Clear any pending tier-upgrade proposal.
    pub clear_upgrade_request: bool,
}

impl ConnectionChanges {
    /// Applies this change set to an edge, bumping `updated_at`.
    ///
    /// Store implementations use this to keep their row mutation in sync
    /// with what the lifecycle reports back to callers.
    pub fn apply_to(&self, edge: &mut ConnectionEdge) {
        if let Some(ref how_met) = self.how_met {
            edge.how_met = how_met.clone();
        }
        if let Some(connection_type) = self.connection_type {
            edge.connection_type = connection_type;
        }
        if self.swap_parties {
            std::mem::swap(&mut edge.requester_id, &mut edge.recipient_id);
        }
        if self.clear_upgrade_request {
            edge.upgrade_request = None;
        }
        if let Some(ref upgrade) = self.upgrade_request {
            edge.upgrade_request = Some(upgrade.clone());
        }
        edge.updated_at = Timestamp::now();
    }
}

/// A connection edge paired with the resolved identity of the endpoint
/// opposite the queried user.
///
/// The store contract resolves the counterpart so graph nodes can be
/// labeled without a second lookup.
#[derive(Clone, Debug)]
pub struct ResolvedConnection {
    /// The underlying connection row.
    pub edge: ConnectionEdge,

    /// The endpoint opposite the user the query was made for.
    pub other_party: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(requester: &str, recipient: &str) -> ConnectionEdge {
        ConnectionEdge {
            id: ConnectionId::new(),
            requester_id: UserId::new(requester),
            recipient_id: UserId::new(recipient),
            status: ConnectionStatus::Pending,
            connection_type: ConnectionType::First,
            how_met: HowMet::new("test", None).unwrap(),
            upgrade_request: None,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
        }
    }

    #[test]
    fn test_involves_and_other_party() {
        let e = edge("alice", "bob");
        let alice = UserId::new("alice");
        let bob = UserId::new("bob");
        let carol = UserId::new("carol");

        assert!(e.involves(&alice));
        assert!(e.involves(&bob));
        assert!(!e.involves(&carol));

        assert_eq!(e.other_party(&alice), Some(&bob));
        assert_eq!(e.other_party(&bob), Some(&alice));
        assert_eq!(e.other_party(&carol), None);
    }

    #[test]
    fn test_pair_key_is_order_independent() {
        let e1 = edge("alice", "bob");
        let e2 = edge("bob", "alice");
        assert_eq!(e1.pair_key(), e2.pair_key());
    }

    #[test]
    fn test_changes_swap_parties() {
        let mut e = edge("alice", "bob");
        let changes = ConnectionChanges {
            swap_parties: true,
            ..Default::default()
        };
        changes.apply_to(&mut e);
        assert_eq!(e.requester_id, UserId::new("bob"));
        assert_eq!(e.recipient_id, UserId::new("alice"));
    }

    #[test]
    fn test_changes_set_and_clear_upgrade() {
        let mut e = edge("alice", "bob");
        e.status = ConnectionStatus::Accepted;
        e.connection_type = ConnectionType::OnePointFive;

        let set = ConnectionChanges {
            upgrade_request: Some(UpgradeRequest {
                requested_type: ConnectionType::First,
                requested_by: UserId::new("alice"),
            }),
            ..Default::default()
        };
        set.apply_to(&mut e);
        assert!(e.upgrade_pending());

        let clear = ConnectionChanges {
            clear_upgrade_request: true,
            ..Default::default()
        };
        clear.apply_to(&mut e);
        assert!(!e.upgrade_pending());
    }

    #[test]
    fn test_changes_default_is_noop_except_timestamp() {
        let mut e = edge("alice", "bob");
        let before = e.clone();
        ConnectionChanges::default().apply_to(&mut e);
        assert_eq!(e.requester_id, before.requester_id);
        assert_eq!(e.recipient_id, before.recipient_id);
        assert_eq!(e.connection_type, before.connection_type);
        assert_eq!(e.how_met, before.how_met);
        assert_eq!(e.upgrade_request, before.upgrade_request);
    }

    #[test]
    fn test_connection_type_display() {
        assert_eq!(ConnectionType::First.to_string(), "first");
        assert_eq!(ConnectionType::OnePointFive.to_string(), "one_point_five");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConnectionStatus::Pending.to_string(), "pending");
        assert_eq!(ConnectionStatus::Accepted.to_string(), "accepted");
        assert_eq!(ConnectionStatus::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_edge_bincode_roundtrip() {
        let mut e = edge("alice", "bob");
        e.upgrade_request = Some(UpgradeRequest {
            requested_type: ConnectionType::First,
            requested_by: UserId::new("alice"),
        });

        let bytes = bincode::serialize(&e).unwrap();
        let restored: ConnectionEdge = bincode::deserialize(&bytes).unwrap();

        assert_eq!(restored.id, e.id);
        assert_eq!(restored.requester_id, e.requester_id);
        assert_eq!(restored.recipient_id, e.recipient_id);
        assert_eq!(restored.status, e.status);
        assert_eq!(restored.connection_type, e.connection_type);
        assert_eq!(restored.how_met, e.how_met);
        assert_eq!(restored.upgrade_request, e.upgrade_request);
    }
}
