//! Error types for tierlink.
//!
//! Tierlink uses a hierarchical error system:
//! - `TierlinkError` is the top-level error returned by all public APIs
//! - Specific error types (`ValidationError`, `NotFoundError`) provide detail
//!
//! Lifecycle mutations are all-or-nothing: every validation failure is
//! reported before any store write happens, and a store failure surfaces
//! as the failure of that one action with no partial state change.
//!
//! # Error Handling Pattern
//! ```rust,ignore
//! use tierlink::{ConnectionLifecycle, Result};
//!
//! async fn example(lifecycle: &ConnectionLifecycle) -> Result<()> {
//!     // ... operations that may fail ...
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::types::UserId;

/// Result type alias for tierlink operations.
pub type Result<T> = std::result::Result<T, TierlinkError>;

/// Top-level error enum for all tierlink operations.
///
/// This is the only error type returned by public APIs.
/// Use pattern matching to handle specific error cases.
#[derive(Debug, Error)]
pub enum TierlinkError {
    /// Input validation error (malformed how-met text, bad year, self-request).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Requested entity not found.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// The acting user is not a valid party to the mutation.
    #[error("'{actor}' is not authorized to {action}")]
    NotAuthorized {
        /// The user who attempted the action.
        actor: UserId,
        /// Short description of the refused action.
        action: String,
    },

    /// A pending request already exists between the pair.
    #[error("a pending request already exists between '{requester}' and '{recipient}'")]
    AlreadyPending {
        /// Requester of the existing pending edge.
        requester: UserId,
        /// Recipient of the existing pending edge.
        recipient: UserId,
    },

    /// Operation not valid for the connection's current status or
    /// type-negotiation state.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Why the operation is not valid right now.
        reason: String,
    },

    /// First-connection quota reached (soft cap, checked not reserved).
    #[error("first-connection quota reached for '{user}' (limit: {limit})")]
    QuotaExceeded {
        /// The user whose quota is exhausted.
        user: UserId,
        /// The configured cap.
        limit: usize,
    },

    /// The backing connection store failed or is unreachable.
    #[error("connection store unavailable: {reason}")]
    Upstream {
        /// Description of the upstream failure.
        reason: String,
    },
}

impl TierlinkError {
    /// Creates a not-authorized error for the given actor and action.
    pub fn not_authorized(actor: UserId, action: impl Into<String>) -> Self {
        Self::NotAuthorized {
            actor,
            action: action.into(),
        }
    }

    /// Creates an already-pending error for the given pair.
    pub fn already_pending(requester: UserId, recipient: UserId) -> Self {
        Self::AlreadyPending {
            requester,
            recipient,
        }
    }

    /// Creates an invalid-state error with the given reason.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        Self::InvalidState {
            reason: reason.into(),
        }
    }

    /// Creates a quota-exceeded error for the given user.
    pub fn quota_exceeded(user: UserId, limit: usize) -> Self {
        Self::QuotaExceeded { user, limit }
    }

    /// Creates an upstream error with the given reason.
    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::Upstream {
            reason: reason.into(),
        }
    }

    /// Returns true if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if this is a not-authorized error.
    pub fn is_not_authorized(&self) -> bool {
        matches!(self, Self::NotAuthorized { .. })
    }

    /// Returns true if this is an already-pending error.
    pub fn is_already_pending(&self) -> bool {
        matches!(self, Self::AlreadyPending { .. })
    }

    /// Returns true if this is an invalid-state error.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Returns true if this is a quota-exceeded error.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// Returns true if this is an upstream (store) error.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

/// Validation errors for input data.
///
/// These errors indicate problems with data provided by the caller.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A field has an invalid value.
    #[error("Invalid field '{field}': {reason}")]
    InvalidField {
        /// Name of the invalid field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// A required field is missing or empty.
    #[error("Required field missing: {field}")]
    RequiredField {
        /// Name of the missing field.
        field: String,
    },
}

impl ValidationError {
    /// Creates an invalid field error.
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a required field error.
    pub fn required_field(field: impl Into<String>) -> Self {
        Self::RequiredField {
            field: field.into(),
        }
    }
}

/// Not found errors for specific entity types.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// Connection with given ID not found.
    #[error("Connection not found: {0}")]
    Connection(String),

    /// User with given ID not known to the graph or store.
    #[error("User not found: {0}")]
    User(String),
}

impl NotFoundError {
    /// Creates a connection not found error.
    pub fn connection(id: impl ToString) -> Self {
        Self::Connection(id.to_string())
    }

    /// Creates a user not found error.
    pub fn user(id: impl ToString) -> Self {
        Self::User(id.to_string())
    }
}
