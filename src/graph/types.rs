//! Data types for the viewer-rooted network graph.
//!
//! All of these are transient: they live in a
//! [`GraphExplorer`](crate::GraphExplorer) instance for one viewing
//! session and are never persisted. Rendering consumes them via
//! [`GraphSnapshot`].

use std::fmt;

use crate::connection::how_met::HowMet;
use crate::connection::types::ConnectionType;
use crate::types::UserId;

/// Classification of a node relative to the viewer.
///
/// Either the tier of a direct hop, `Pending` for an unaccepted request
/// adjacent to the viewer, or `Unknown` for the root itself. Replaces the
/// duck-typed fallback chains of earlier designs with one tagged union
/// and one derivation rule (see [`classify`](crate::classify)).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathClass {
    /// Reached along a path whose classification is `first`.
    First,
    /// Reached along a path whose classification is `one_point_five`.
    OnePointFive,
    /// Adjacent via an unaccepted request; never expanded further.
    Pending,
    /// No classification (the viewer's own node).
    Unknown,
}

impl PathClass {
    /// Ranking used when two observations of the same node disagree.
    /// Higher wins; ties fall back to the shorter path.
    pub const fn priority(self) -> u8 {
        match self {
            Self::First => 3,
            Self::OnePointFive => 2,
            Self::Pending => 1,
            Self::Unknown => 0,
        }
    }

    /// Canonical lowercase name, for labels and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::OnePointFive => "one_point_five",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }
}

impl From<ConnectionType> for PathClass {
    fn from(tier: ConnectionType) -> Self {
        match tier {
            ConnectionType::First => Self::First,
            ConnectionType::OnePointFive => Self::OnePointFive,
        }
    }
}

impl fmt::Display for PathClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user in the explored graph.
#[derive(Clone, Debug)]
pub struct GraphNode {
    /// The user this node represents.
    pub id: UserId,

    /// Resolved display label.
    pub label: String,

    /// Hop count from the viewer (viewer itself is 0).
    pub distance: u32,

    /// Class of the direct edge by which this node's parent reached it.
    pub connection_type: PathClass,

    /// Classification inherited along the path from the viewer.
    pub path_class: PathClass,
}

/// One relationship in the explored graph.
///
/// Deduplicated by unordered endpoint pair, so re-expansion from the
/// opposite direction never produces a second edge.
#[derive(Clone, Debug)]
pub struct GraphLink {
    /// The node that was being expanded when this link was discovered.
    pub source: UserId,

    /// The neighbor the link leads to.
    pub target: UserId,

    /// How the two users met, for display.
    pub how_met: HowMet,

    /// Class of the underlying edge.
    pub connection_type: PathClass,
}

/// Read-only copy of the explored graph, suitable for rendering.
///
/// Nodes are ordered by distance then id for stable layouts; links are in
/// discovery order.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
    /// All discovered nodes, the viewer included.
    pub nodes: Vec<GraphNode>,

    /// All discovered links.
    pub links: Vec<GraphLink>,
}

/// Why an [`expand`](crate::GraphExplorer::expand) call did or did not
/// fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// The node was fetched and its neighbors merged.
    Expanded,
    /// The node was expanded earlier (or a fetch is in flight); no-op.
    AlreadyExpanded,
    /// The node sits at the visibility depth limit; no-op.
    DepthLimit,
    /// The node is an unaccepted request; its network stays invisible.
    PendingLeaf,
}

/// Result of one [`expand`](crate::GraphExplorer::expand) call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expansion {
    /// What the call did.
    pub outcome: ExpandOutcome,

    /// Nodes newly inserted by this call.
    pub discovered: usize,

    /// Existing nodes reclassified by this call.
    pub updated: usize,

    /// Links newly inserted by this call.
    pub links_added: usize,
}

impl Expansion {
    pub(crate) fn skipped(outcome: ExpandOutcome) -> Self {
        Self {
            outcome,
            discovered: 0,
            updated: 0,
            links_added: 0,
        }
    }
}
