//! Identity resolution contract.
//!
//! Tierlink never authenticates anyone. The consumer's transport layer
//! resolves "who is calling" through an [`IdentityResolver`] and passes
//! the resulting [`UserId`] into lifecycle operations as the actor.

use async_trait::async_trait;

use crate::error::{Result, TierlinkError};
use crate::types::UserId;

/// Transport-agnostic request context handed to the resolver.
///
/// Carries whatever credentials the transport extracted; resolvers pick
/// the field(s) their auth system understands.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// Bearer token from an `Authorization` header, if any.
    pub bearer_token: Option<String>,

    /// Session cookie or server-side session id, if any.
    pub session_id: Option<String>,
}

impl RequestContext {
    /// Creates an empty (anonymous) context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying a bearer token.
    pub fn with_bearer_token(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
            session_id: None,
        }
    }

    /// Context carrying a session id.
    pub fn with_session_id(session: impl Into<String>) -> Self {
        Self {
            bearer_token: None,
            session_id: Some(session.into()),
        }
    }
}

/// Contract for resolving the calling user's identity.
///
/// Returns `Ok(None)` for an anonymous caller; errors are reserved for
/// resolver-side failures (e.g. the auth service being unreachable).
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolves the calling user, or `None` if the context carries no
    /// valid identity.
    async fn resolve_current_user(&self, ctx: &RequestContext) -> Result<Option<UserId>>;
}

/// Resolves to a fixed user regardless of context.
///
/// For tests and single-user tools.
#[derive(Clone, Debug)]
pub struct StaticIdentity(pub UserId);

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn resolve_current_user(&self, _ctx: &RequestContext) -> Result<Option<UserId>> {
        Ok(Some(self.0.clone()))
    }
}

/// Resolves the caller or fails with `NotAuthorized`.
///
/// Convenience for call sites where anonymous access is never valid.
pub async fn require_current_user(
    resolver: &dyn IdentityResolver,
    ctx: &RequestContext,
) -> Result<UserId> {
    resolver
        .resolve_current_user(ctx)
        .await?
        .ok_or_else(|| TierlinkError::not_authorized(UserId::new("anonymous"), "act on connections"))
}
