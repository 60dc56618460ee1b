//! The per-connection lifecycle state machine.
//!
//! One [`SessionLifecycle`] exists per accepted connection, owned
//! exclusively by that connection's handler task. It moves strictly
//! forward:
//!
//! ```text
//! Unauthenticated ──auth ok──→ Authenticated ──join ok──→ Joined
//!        │                          │                       │
//!        └────────── any failure / close ──────────────────→ Closed
//! ```
//!
//! No state is ever revisited. The phases are a tagged enum, not boolean
//! flags, so "joined but not authenticated" is unrepresentable and a
//! `message` before `join` has no identity to attribute itself to.

use crate::{Identity, SessionError};

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where a session currently is in its life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connection accepted, no credential seen yet. Only `auth` is
    /// acceptable here; anything else is a protocol violation.
    Unauthenticated,

    /// Credential verified; we know who this is but they haven't picked
    /// a channel yet.
    Authenticated { identity: Identity },

    /// Registered as a member of exactly one channel.
    Joined {
        identity: Identity,
        channel: String,
    },

    /// Terminal. Reached from any phase — explicit close, protocol
    /// violation, or transport failure.
    Closed,
}

impl SessionPhase {
    fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "Unauthenticated",
            Self::Authenticated { .. } => "Authenticated",
            Self::Joined { .. } => "Joined",
            Self::Closed => "Closed",
        }
    }
}

/// What a session was when it closed, if it had made it into a channel.
///
/// Returned at most once by [`SessionLifecycle::close`] — it is the
/// exactly-once ticket for departure cleanup (deregistration and the
/// "user left" broadcasts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedSession {
    pub identity: Identity,
    pub channel: String,
}

// ---------------------------------------------------------------------------
// SessionLifecycle
// ---------------------------------------------------------------------------

/// The state machine for one connection.
///
/// Pure by design: transitions validate and record state; the connection
/// handler performs the I/O each transition implies.
#[derive(Debug)]
pub struct SessionLifecycle {
    phase: SessionPhase,
}

impl SessionLifecycle {
    /// Creates a fresh lifecycle in the `Unauthenticated` phase.
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Returns the authenticated identity, if past authentication.
    pub fn identity(&self) -> Option<&Identity> {
        match &self.phase {
            SessionPhase::Authenticated { identity }
            | SessionPhase::Joined { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Records a successful credential verification.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] unless the session is
    /// `Unauthenticated`.
    pub fn authenticate(
        &mut self,
        identity: Identity,
    ) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Unauthenticated => {
                tracing::debug!(user = %identity.user, "session authenticated");
                self.phase = SessionPhase::Authenticated { identity };
                Ok(())
            }
            _ => Err(SessionError::InvalidTransition {
                from: self.phase.name(),
                to: "Authenticated",
            }),
        }
    }

    /// Records a successful channel registration.
    ///
    /// # Errors
    /// [`SessionError::InvalidTransition`] unless the session is
    /// `Authenticated` — a session is a member of at most one channel,
    /// so joining from `Joined` is rejected rather than re-homed.
    pub fn join(&mut self, channel: String) -> Result<(), SessionError> {
        match std::mem::replace(&mut self.phase, SessionPhase::Closed) {
            SessionPhase::Authenticated { identity } => {
                tracing::debug!(
                    user = %identity.user,
                    %channel,
                    "session joined channel"
                );
                self.phase = SessionPhase::Joined { identity, channel };
                Ok(())
            }
            other => {
                let from = other.name();
                self.phase = other;
                Err(SessionError::InvalidTransition {
                    from,
                    to: "Joined",
                })
            }
        }
    }

    /// Moves to `Closed`, from any phase, and yields the joined
    /// identity/channel if there was one.
    ///
    /// Idempotent: the first call on a joined session returns
    /// `Some(JoinedSession)`, every later call returns `None`. Callers
    /// key departure cleanup off that `Some`, which is how "deregister
    /// and broadcast exactly once" survives a close racing an error.
    pub fn close(&mut self) -> Option<JoinedSession> {
        match std::mem::replace(&mut self.phase, SessionPhase::Closed) {
            SessionPhase::Joined { identity, channel } => {
                tracing::debug!(
                    user = %identity.user,
                    %channel,
                    "session closed after join"
                );
                Some(JoinedSession { identity, channel })
            }
            _ => None,
        }
    }

    /// Returns `true` once the session has reached its terminal phase.
    pub fn is_closed(&self) -> bool {
        matches!(self.phase, SessionPhase::Closed)
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity {
            user: "alice".into(),
            avatar: "🐶".into(),
        }
    }

    // =====================================================================
    // authenticate()
    // =====================================================================

    #[test]
    fn test_authenticate_from_unauthenticated_succeeds() {
        let mut lc = SessionLifecycle::new();

        lc.authenticate(alice()).expect("should authenticate");

        assert!(matches!(
            lc.phase(),
            SessionPhase::Authenticated { identity } if identity.user == "alice"
        ));
        assert_eq!(lc.identity().unwrap().avatar, "🐶");
    }

    #[test]
    fn test_authenticate_twice_is_rejected() {
        let mut lc = SessionLifecycle::new();
        lc.authenticate(alice()).unwrap();

        let result = lc.authenticate(alice());

        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition {
                from: "Authenticated",
                to: "Authenticated"
            })
        ));
    }

    #[test]
    fn test_authenticate_after_close_is_rejected() {
        let mut lc = SessionLifecycle::new();
        lc.close();

        let result = lc.authenticate(alice());

        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition { from: "Closed", .. })
        ));
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_from_authenticated_succeeds() {
        let mut lc = SessionLifecycle::new();
        lc.authenticate(alice()).unwrap();

        lc.join("general".into()).expect("should join");

        assert!(matches!(
            lc.phase(),
            SessionPhase::Joined { channel, .. } if channel == "general"
        ));
        // The identity survives the transition.
        assert_eq!(lc.identity().unwrap().user, "alice");
    }

    #[test]
    fn test_join_before_authentication_is_rejected() {
        let mut lc = SessionLifecycle::new();

        let result = lc.join("general".into());

        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition {
                from: "Unauthenticated",
                to: "Joined"
            })
        ));
        // The failed attempt must not disturb the phase.
        assert!(matches!(lc.phase(), SessionPhase::Unauthenticated));
    }

    #[test]
    fn test_join_twice_is_rejected_and_keeps_first_channel() {
        // One channel per session: a second join is an error, not a move.
        let mut lc = SessionLifecycle::new();
        lc.authenticate(alice()).unwrap();
        lc.join("general".into()).unwrap();

        let result = lc.join("random".into());

        assert!(matches!(
            result,
            Err(SessionError::InvalidTransition { from: "Joined", .. })
        ));
        assert!(matches!(
            lc.phase(),
            SessionPhase::Joined { channel, .. } if channel == "general"
        ));
    }

    // =====================================================================
    // close()
    // =====================================================================

    #[test]
    fn test_close_joined_session_yields_membership_once() {
        let mut lc = SessionLifecycle::new();
        lc.authenticate(alice()).unwrap();
        lc.join("general".into()).unwrap();

        let first = lc.close();
        let second = lc.close();

        let joined = first.expect("first close yields the membership");
        assert_eq!(joined.identity.user, "alice");
        assert_eq!(joined.channel, "general");
        assert!(second.is_none(), "second close must be a no-op");
        assert!(lc.is_closed());
    }

    #[test]
    fn test_close_before_join_yields_nothing() {
        let mut lc = SessionLifecycle::new();
        lc.authenticate(alice()).unwrap();

        assert!(lc.close().is_none());
        assert!(lc.is_closed());
    }

    #[test]
    fn test_close_unauthenticated_session_yields_nothing() {
        let mut lc = SessionLifecycle::new();

        assert!(lc.close().is_none());
        assert!(lc.is_closed());
    }

    // =====================================================================
    // Forward-only ordering
    // =====================================================================

    #[test]
    fn test_full_lifecycle_walks_strictly_forward() {
        let mut lc = SessionLifecycle::new();
        assert!(matches!(lc.phase(), SessionPhase::Unauthenticated));

        lc.authenticate(alice()).unwrap();
        assert!(matches!(lc.phase(), SessionPhase::Authenticated { .. }));

        lc.join("general".into()).unwrap();
        assert!(matches!(lc.phase(), SessionPhase::Joined { .. }));

        lc.close();
        assert!(lc.is_closed());

        // Nothing works from Closed.
        assert!(lc.authenticate(alice()).is_err());
        assert!(lc.join("general".into()).is_err());
        assert!(lc.close().is_none());
    }
}
