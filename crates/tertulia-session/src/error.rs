//! Error types for the session layer.

/// Errors that can occur during a session's lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The credential was invalid, expired, or rejected by the
    /// [`AuthProvider`](crate::AuthProvider). Fatal: the connection is
    /// closed, the server never retries on the client's behalf.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A `join` event claimed an identity other than the one the
    /// credential resolved to.
    #[error("join as {claimed:?} does not match authenticated user {authenticated:?}")]
    IdentityMismatch {
        claimed: String,
        authenticated: String,
    },

    /// An operation was attempted in a phase that doesn't allow it.
    /// The lifecycle only ever moves forward; nothing is revisited.
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}
