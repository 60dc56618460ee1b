//! Authentication hook for validating a client's credential.
//!
//! Tertulia doesn't implement authentication itself — that belongs to
//! whatever issued the credential (a login service, Firebase, a custom
//! JWT signer). This module defines the seam: [`AuthProvider::verify`]
//! takes the token string from an `auth` event and returns a strongly
//! typed [`Identity`] or fails.
//!
//! The identity returned here is **authoritative**: whatever a client
//! later claims in its `join` event must match it.

use std::collections::HashMap;

use crate::SessionError;

/// Who a credential resolved to.
///
/// Validated once, at the `Unauthenticated → Authenticated` transition,
/// and carried by the session from then on. Deliberately not a loose map
/// of claims — the rest of the system never touches a raw token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The user's name. Unique per session, at most one session per
    /// channel may carry it.
    pub user: String,
    /// The user's avatar, chosen at registration time.
    pub avatar: String,
}

/// Validates a client's credential and returns their identity.
///
/// Treated as a potentially slow external call: the session layer awaits
/// it without holding any shared lock.
///
/// # Example
///
/// ```rust
/// use tertulia_session::{AuthProvider, Identity, SessionError};
///
/// /// Accepts `user:avatar` tokens. Development only!
/// struct SplitAuth;
///
/// impl AuthProvider for SplitAuth {
///     async fn verify(&self, token: &str) -> Result<Identity, SessionError> {
///         let (user, avatar) = token.split_once(':').ok_or_else(|| {
///             SessionError::AuthFailed("malformed token".into())
///         })?;
///         Ok(Identity { user: user.into(), avatar: avatar.into() })
///     }
/// }
/// ```
pub trait AuthProvider: Send + Sync + 'static {
    /// Validates the given token.
    ///
    /// # Returns
    /// - `Ok(Identity)` — the credential is valid, here's who it names
    /// - `Err(SessionError::AuthFailed)` — invalid, expired, or revoked
    fn verify(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<Identity, SessionError>> + Send;
}

// ---------------------------------------------------------------------------
// StaticAuthProvider
// ---------------------------------------------------------------------------

/// An [`AuthProvider`] backed by a fixed token table.
///
/// For development and tests only — tokens are plain strings issued by
/// [`issue`](Self::issue), with no expiry and no signature. A real
/// deployment plugs in a provider that talks to its credential service.
#[derive(Debug, Default, Clone)]
pub struct StaticAuthProvider {
    tokens: HashMap<String, Identity>,
}

impl StaticAuthProvider {
    /// Creates an empty provider that rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for the given identity.
    pub fn issue(
        &mut self,
        token: impl Into<String>,
        user: impl Into<String>,
        avatar: impl Into<String>,
    ) {
        self.tokens.insert(
            token.into(),
            Identity {
                user: user.into(),
                avatar: avatar.into(),
            },
        );
    }
}

impl AuthProvider for StaticAuthProvider {
    async fn verify(&self, token: &str) -> Result<Identity, SessionError> {
        self.tokens.get(token).cloned().ok_or_else(|| {
            SessionError::AuthFailed("unknown or expired token".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_verify_known_token_returns_identity() {
        let mut auth = StaticAuthProvider::new();
        auth.issue("tok-1", "alice", "🐶");

        let identity = auth.verify("tok-1").await.expect("should verify");

        assert_eq!(identity.user, "alice");
        assert_eq!(identity.avatar, "🐶");
    }

    #[tokio::test]
    async fn test_static_provider_verify_unknown_token_fails() {
        let auth = StaticAuthProvider::new();

        let result = auth.verify("who-dis").await;

        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }

    #[tokio::test]
    async fn test_static_provider_tokens_are_independent() {
        let mut auth = StaticAuthProvider::new();
        auth.issue("tok-a", "alice", "🐶");
        auth.issue("tok-b", "bob", "🐱");

        assert_eq!(auth.verify("tok-a").await.unwrap().user, "alice");
        assert_eq!(auth.verify("tok-b").await.unwrap().user, "bob");
    }
}
