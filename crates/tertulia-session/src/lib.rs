//! Session lifecycle for Tertulia.
//!
//! This crate owns two things:
//!
//! 1. **Authentication** — the [`AuthProvider`] trait that resolves an
//!    opaque credential into an [`Identity`]. Credential *issuance*
//!    (register/login, hashing, token minting) is somebody else's job.
//! 2. **The lifecycle state machine** — [`SessionLifecycle`], which walks
//!    a connection strictly forward through
//!    `Unauthenticated → Authenticated → Joined → Closed` and rejects
//!    every other transition.
//!
//! The machine here is pure: no I/O, no locks, no awaits. The meta crate's
//! connection handler drives it and performs the effects (registry calls,
//! broadcasts) that each transition demands. That split keeps the state
//! rules unit-testable without a socket in sight.

mod auth;
mod config;
mod error;
mod lifecycle;

pub use auth::{AuthProvider, Identity, StaticAuthProvider};
pub use config::SessionConfig;
pub use error::SessionError;
pub use lifecycle::{JoinedSession, SessionLifecycle, SessionPhase};
