//! Incremental graph exploration module.
//!
//! A [`GraphExplorer`] maintains an in-memory node/edge set rooted at a
//! viewer and grows it lazily: each [`expand`](GraphExplorer::expand)
//! call fetches one user's accepted connections through the lifecycle's
//! read path and merges the neighbors in, computing hop distances and
//! path classifications as it goes. The viewer's own pending requests are
//! merged as leaf nodes when the root is expanded.
//!
//! # Invariants
//!
//! - A user appears at most once in the node set
//! - A relationship appears at most once in the link set, regardless of
//!   which direction discovered it
//! - A node classified `pending` is never expanded
//! - Expansion stops at the configured visibility depth
//! - Concurrent expands of the same node collapse to one fetch
//!
//! Exploration is best-effort: a fetch failure leaves previously merged
//! state intact and the failed node unexpanded. Callers can re-arm a
//! single node with [`clear_visited`](GraphExplorer::clear_visited).

pub mod classify;
pub mod types;

pub use classify::{classify, inherited_class, Decision};
pub use types::{ExpandOutcome, Expansion, GraphLink, GraphNode, GraphSnapshot, PathClass};

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, warn};

use crate::config::ExplorerConfig;
use crate::connection::types::ResolvedConnection;
use crate::connection::ConnectionLifecycle;
use crate::error::{NotFoundError, Result};
use crate::types::{UserId, UserProfile};
use crate::watch::ConnectionEvent;

/// The incremental, viewer-rooted network explorer.
///
/// One instance per viewing session. State is owned exclusively by the
/// instance (no process-wide caches) and guarded by a mutex so that
/// interleaved async `expand` calls merge atomically per neighbor. The
/// lock is never held across an `.await`.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use tierlink::{ExplorerConfig, GraphExplorer, UserProfile, UserId};
///
/// let viewer = UserProfile::new(UserId::new("alice"), "alice");
/// let explorer = GraphExplorer::new(lifecycle, viewer, ExplorerConfig::default())?;
///
/// explorer.expand(&UserId::new("alice")).await?;
/// let snapshot = explorer.snapshot();
/// ```
pub struct GraphExplorer {
    lifecycle: Arc<ConnectionLifecycle>,
    viewer_id: UserId,
    max_depth: u32,
    state: Mutex<ExplorerState>,
}

#[derive(Default)]
struct ExplorerState {
    nodes: HashMap<UserId, GraphNode>,
    links: Vec<GraphLink>,
    /// Unordered endpoint pairs already represented in `links`.
    link_keys: HashSet<(UserId, UserId)>,
    /// Nodes whose fetch has been started (not necessarily finished).
    visited: HashSet<UserId>,
}

fn pair_key(a: &UserId, b: &UserId) -> (UserId, UserId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl GraphExplorer {
    /// Creates an explorer seeded with the viewer at distance 0.
    ///
    /// `config.max_depth` should carry the viewer's stored visibility
    /// preference; use [`ExplorerConfig::default`] when they have none.
    ///
    /// # Errors
    /// Returns a validation error if the config is out of bounds.
    pub fn new(
        lifecycle: Arc<ConnectionLifecycle>,
        viewer: UserProfile,
        config: ExplorerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let root = GraphNode {
            id: viewer.id.clone(),
            label: viewer.display_name().to_string(),
            distance: 0,
            connection_type: PathClass::Unknown,
            path_class: PathClass::Unknown,
        };

        let mut state = ExplorerState::default();
        state.nodes.insert(root.id.clone(), root);

        Ok(Self {
            lifecycle,
            viewer_id: viewer.id,
            max_depth: config.max_depth,
            state: Mutex::new(state),
        })
    }

    /// The viewer this explorer is rooted at.
    pub fn viewer_id(&self) -> &UserId {
        &self.viewer_id
    }

    /// Expands one node, fetching its connections and merging neighbors.
    ///
    /// No-ops (with the corresponding [`ExpandOutcome`]) when the node
    /// was already expanded, sits at the depth limit, or is a pending
    /// leaf. The visited mark is taken *before* the fetch, so concurrent
    /// expands of the same node collapse to a single effective read.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node is not in the graph yet
    /// - `Upstream` (or whatever the store surfaced) if the fetch failed;
    ///   the node stays visited and previously merged state is untouched.
    ///   Re-arm with [`clear_visited`](Self::clear_visited) to retry.
    #[instrument(skip(self))]
    pub async fn expand(&self, node_id: &UserId) -> Result<Expansion> {
        let is_viewer = node_id == &self.viewer_id;

        // Phase 1: decide and claim under the lock.
        {
            let mut state = self.lock();
            let node = state
                .nodes
                .get(node_id)
                .ok_or_else(|| NotFoundError::user(node_id))?;

            if state.visited.contains(node_id) {
                return Ok(Expansion::skipped(ExpandOutcome::AlreadyExpanded));
            }
            if node.path_class == PathClass::Pending {
                return Ok(Expansion::skipped(ExpandOutcome::PendingLeaf));
            }
            if node.distance >= self.max_depth {
                return Ok(Expansion::skipped(ExpandOutcome::DepthLimit));
            }

            // Claim before fetching so a concurrent expand of the same
            // node sees AlreadyExpanded instead of starting a second read.
            state.visited.insert(node_id.clone());
        }

        // Phase 2: fetch without holding the lock.
        let accepted = match self.lifecycle.accepted_connections(node_id).await {
            Ok(connections) => connections,
            Err(err) => {
                warn!(node = %node_id, error = %err, "expansion fetch failed; node left unexpanded");
                return Err(err);
            }
        };
        let pending = if is_viewer {
            match self.lifecycle.pending_requests(node_id).await {
                Ok(connections) => connections,
                Err(err) => {
                    warn!(node = %node_id, error = %err, "pending fetch failed; node left unexpanded");
                    return Err(err);
                }
            }
        } else {
            Vec::new()
        };

        // Phase 3: merge under the lock, atomically per neighbor.
        let mut state = self.lock();
        let (parent_distance, parent_path) = {
            let parent = state
                .nodes
                .get(node_id)
                .ok_or_else(|| NotFoundError::user(node_id))?;
            let path = if is_viewer {
                None
            } else {
                Some(parent.path_class)
            };
            (parent.distance, path)
        };
        let candidate_distance = parent_distance + 1;

        let mut expansion = Expansion {
            outcome: ExpandOutcome::Expanded,
            discovered: 0,
            updated: 0,
            links_added: 0,
        };

        let neighbors = accepted
            .into_iter()
            .map(|conn| {
                let hop = PathClass::from(conn.edge.connection_type);
                (conn, hop)
            })
            .chain(pending.into_iter().map(|conn| (conn, PathClass::Pending)));

        for (conn, hop_class) in neighbors {
            self.merge_neighbor(
                &mut state,
                node_id,
                &conn,
                hop_class,
                parent_path,
                candidate_distance,
                &mut expansion,
            );
        }

        debug!(
            node = %node_id,
            discovered = expansion.discovered,
            updated = expansion.updated,
            links = expansion.links_added,
            "node expanded"
        );
        Ok(expansion)
    }

    /// Returns a read-only copy of the current graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        let state = self.lock();
        let mut nodes: Vec<GraphNode> = state.nodes.values().cloned().collect();
        nodes.sort_by(|a, b| (a.distance, &a.id).cmp(&(b.distance, &b.id)));
        GraphSnapshot {
            nodes,
            links: state.links.clone(),
        }
    }

    /// Removes one node from the visited set so it can be expanded again.
    ///
    /// Returns true if the node was marked. The node's merged neighbors
    /// are untouched; a subsequent expand re-reads and re-merges.
    pub fn clear_visited(&self, node_id: &UserId) -> bool {
        self.lock().visited.remove(node_id)
    }

    /// Reacts to a pushed lifecycle event by re-arming the affected
    /// endpoints for expansion.
    ///
    /// Purely an optimization for live views; exploration is correct
    /// without any events being applied.
    pub fn apply_event(&self, event: &ConnectionEvent) {
        let mut state = self.lock();
        for party in &event.parties {
            if state.nodes.contains_key(party) && state.visited.remove(party) {
                debug!(node = %party, kind = ?event.kind, "node re-armed by event");
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn merge_neighbor(
        &self,
        state: &mut ExplorerState,
        node_id: &UserId,
        conn: &ResolvedConnection,
        hop_class: PathClass,
        parent_path: Option<PathClass>,
        candidate_distance: u32,
        expansion: &mut Expansion,
    ) {
        let neighbor = conn.other_party.id.clone();

        // The root is never reclassified; everything else goes through
        // the classifier.
        if neighbor != self.viewer_id {
            let candidate_class = inherited_class(parent_path, hop_class);
            let existing = state
                .nodes
                .get(&neighbor)
                .map(|n| (n.path_class, n.distance));

            match classify(existing, candidate_class, candidate_distance) {
                Decision::Insert => {
                    state.nodes.insert(
                        neighbor.clone(),
                        GraphNode {
                            id: neighbor.clone(),
                            label: conn.other_party.display_name().to_string(),
                            distance: candidate_distance,
                            connection_type: hop_class,
                            path_class: candidate_class,
                        },
                    );
                    expansion.discovered += 1;
                }
                Decision::Update => {
                    if let Some(node) = state.nodes.get_mut(&neighbor) {
                        node.distance = candidate_distance;
                        node.connection_type = hop_class;
                        node.path_class = candidate_class;
                        expansion.updated += 1;
                    }
                }
                Decision::Keep => {}
            }
        }

        let key = pair_key(node_id, &neighbor);
        if state.link_keys.insert(key) {
            state.links.push(GraphLink {
                source: node_id.clone(),
                target: neighbor,
                how_met: conn.edge.how_met.clone(),
                connection_type: hop_class,
            });
            expansion.links_added += 1;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ExplorerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
