//! # Tierlink
//!
//! Connection-graph core for tiered social networks.
//!
//! Tierlink implements the two halves of a user-to-user connection system
//! that carry real invariants: the **relationship state machine** that
//! negotiates tiered connections between users, and the **incremental
//! graph explorer** that lazily walks a viewer's reachable network.
//! Persistence, authentication, and rendering stay outside, behind
//! traits.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tierlink::{
//!     ConnectionLifecycle, ConnectionType, ExplorerConfig, GraphExplorer,
//!     HowMet, MemoryStore, UserId, UserProfile,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let lifecycle = Arc::new(ConnectionLifecycle::new(store));
//!
//! // Negotiate a connection
//! let edge = lifecycle
//!     .send_request(
//!         UserId::new("alice"),
//!         UserId::new("bob"),
//!         HowMet::new("Met at a conference", Some(2019))?,
//!         ConnectionType::First,
//!     )
//!     .await?;
//! lifecycle.accept_request(edge.id, &UserId::new("bob")).await?;
//!
//! // Explore the network from Alice's point of view
//! let viewer = UserProfile::new(UserId::new("alice"), "alice");
//! let explorer = GraphExplorer::new(lifecycle, viewer, ExplorerConfig::default())?;
//! explorer.expand(&UserId::new("alice")).await?;
//! let snapshot = explorer.snapshot();
//! ```
//!
//! ## Key Concepts
//!
//! ### Connection
//!
//! A **connection** is a durable edge between two users: directional
//! while pending (requester → recipient), symmetric once accepted. Its
//! strength is one of two tiers: `first` (strong, capped at 100 per
//! user) or `one_point_five` (weak, unlimited). Terms are negotiated
//! through amend/counter while pending and upgrade/downgrade once
//! accepted.
//!
//! ### Exploration
//!
//! A [`GraphExplorer`] is rooted at a viewer and grows one node at a
//! time as the user clicks outward, up to the viewer's visibility depth.
//! Nodes reached along several paths are classified by a pure
//! priority/shortest-path rule ([`classify`]); unaccepted requests show
//! up as leaves that never expand.
//!
//! ## Thread Safety
//!
//! [`ConnectionLifecycle`] and [`GraphExplorer`] are `Send + Sync` and
//! designed to be shared behind `Arc`. Explorer merges are atomic per
//! neighbor, so interleaved `expand` calls are safe.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

// ============================================================================
// Module declarations
// ============================================================================

mod config;
mod error;
mod types;

pub mod connection;
pub mod graph;
pub mod identity;
pub mod store;
pub mod watch;

// ============================================================================
// Public API re-exports
// ============================================================================

// Lifecycle and negotiation
pub use connection::{
    ConnectionChanges, ConnectionEdge, ConnectionLifecycle, ConnectionRequest, ConnectionStatus,
    ConnectionType, HowMet, ResolvedConnection, UpgradeRequest, MAX_FIRST_CONNECTIONS,
};

// Graph exploration
pub use graph::{
    classify, inherited_class, Decision, ExpandOutcome, Expansion, GraphExplorer, GraphLink,
    GraphNode, GraphSnapshot, PathClass,
};

// Configuration
pub use config::{ExplorerConfig, DEFAULT_VISIBILITY_DEPTH, MAX_VISIBILITY_DEPTH};

// Error handling
pub use error::{NotFoundError, Result, TierlinkError, ValidationError};

// Core types
pub use types::{ConnectionId, Timestamp, UserId, UserProfile};

// Storage contract (for backend implementors)
pub use store::{ConnectionStore, MemoryStore};

// Identity contract (for transport layers)
pub use identity::{IdentityResolver, RequestContext, StaticIdentity};

// Events
pub use watch::{ConnectionEvent, ConnectionEventKind, EventSubscription};

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Convenient imports for common tierlink usage.
///
/// ```rust
/// use tierlink::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ExplorerConfig;
    pub use crate::connection::{
        ConnectionEdge, ConnectionLifecycle, ConnectionStatus, ConnectionType, HowMet,
    };
    pub use crate::error::{Result, TierlinkError};
    pub use crate::graph::{GraphExplorer, GraphSnapshot, PathClass};
    pub use crate::store::{ConnectionStore, MemoryStore};
    pub use crate::types::{ConnectionId, UserId, UserProfile};
}
