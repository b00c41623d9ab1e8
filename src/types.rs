//! Core type definitions for tierlink identifiers and timestamps.
//!
//! This module defines the fundamental ID types used throughout tierlink.
//! Connection rows use UUID v7 for time-ordered unique identification;
//! user identities are opaque strings supplied by the consumer's auth system.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque user identifier.
///
/// Tierlink doesn't handle authentication - the consumer provides user IDs.
/// This allows integration with any auth system (OAuth, API keys, etc.).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a new UserId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the user ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connection identifier (UUID v7 for time-ordering).
///
/// Each connection row between two users carries exactly one id for its
/// entire lifetime; negotiation (amend, counter, upgrade) mutates the row
/// in place rather than minting a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Creates a new ConnectionId with a UUID v7 (time-ordered).
    #[inline]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a nil (all zeros) ConnectionId.
    /// Useful for testing or sentinel values.
    #[inline]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns the raw UUID bytes for storage.
    #[inline]
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Creates a ConnectionId from raw bytes.
    #[inline]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for ConnectionId {
    /// Returns a nil (all zeros) ConnectionId.
    ///
    /// For a new unique ID, use [`ConnectionId::new()`].
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds.
///
/// Using i64 allows representing dates far into the future and past.
/// Millisecond precision is sufficient for relationship bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// If the system clock is before the Unix epoch (should never happen
    /// in practice), returns a timestamp of 0 (epoch) rather than panicking.
    #[inline]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self(duration.as_millis() as i64)
    }

    /// Creates a timestamp from Unix milliseconds.
    #[inline]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as Unix milliseconds.
    #[inline]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's display identity, as resolved by the backing store.
///
/// Tierlink stores no user records of its own; the store contract returns
/// a profile alongside each connection so graph nodes can be labeled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user this profile describes.
    pub id: UserId,

    /// Self-chosen display name, preferred over everything else.
    pub preferred_name: Option<String>,

    /// Full name from the user's account.
    pub name: Option<String>,

    /// Login handle, always present.
    pub username: String,
}

impl UserProfile {
    /// Creates a profile with only a username set.
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            preferred_name: None,
            name: None,
            username: username.into(),
        }
    }

    /// Creates a minimal placeholder profile for a user the store could
    /// not resolve; the raw id doubles as the username.
    pub fn bare(id: UserId) -> Self {
        let username = id.as_str().to_string();
        Self {
            id,
            preferred_name: None,
            name: None,
            username,
        }
    }

    /// Resolves the label to show for this user.
    ///
    /// Precedence: `preferred_name` > `name` > `username`.
    pub fn display_name(&self) -> &str {
        self.preferred_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id() {
        let id = UserId::new("user-123");
        assert_eq!(id.as_str(), "user-123");
        assert_eq!(format!("{}", id), "user-123");
    }

    #[test]
    fn test_user_id_ordering() {
        let a = UserId::new("alice");
        let b = UserId::new("bob");
        assert!(a < b);
    }

    #[test]
    fn test_connection_id_new_is_unique() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_connection_id_nil() {
        let id = ConnectionId::nil();
        assert_eq!(id.0, Uuid::nil());
    }

    #[test]
    fn test_connection_id_bytes_roundtrip() {
        let id = ConnectionId::new();
        let bytes = *id.as_bytes();
        let restored = ConnectionId::from_bytes(bytes);
        assert_eq!(id, restored);
    }

    #[test]
    fn test_connection_id_serialization() {
        let id = ConnectionId::new();
        let bytes = bincode::serialize(&id).unwrap();
        let restored: ConnectionId = bincode::deserialize(&bytes).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn test_timestamp_now() {
        let t1 = Timestamp::now();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let t2 = Timestamp::now();
        assert!(t1 < t2, "Timestamps should be ordered");
    }

    #[test]
    fn test_timestamp_ordering() {
        let t1 = Timestamp::from_millis(1000);
        let t2 = Timestamp::from_millis(2000);
        assert!(t1 < t2);
    }

    #[test]
    fn test_display_name_prefers_preferred_name() {
        let profile = UserProfile {
            id: UserId::new("u1"),
            preferred_name: Some("Ada".to_string()),
            name: Some("Ada Lovelace".to_string()),
            username: "alovelace".to_string(),
        };
        assert_eq!(profile.display_name(), "Ada");
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let profile = UserProfile {
            id: UserId::new("u1"),
            preferred_name: None,
            name: Some("Ada Lovelace".to_string()),
            username: "alovelace".to_string(),
        };
        assert_eq!(profile.display_name(), "Ada Lovelace");
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        let profile = UserProfile::new(UserId::new("u1"), "alovelace");
        assert_eq!(profile.display_name(), "alovelace");
    }

    #[test]
    fn test_bare_profile_uses_id_as_username() {
        let profile = UserProfile::bare(UserId::new("user-9"));
        assert_eq!(profile.display_name(), "user-9");
    }
}
