//! Unified error type for the Tertulia server.

use tertulia_protocol::ProtocolError;
use tertulia_registry::RegistryError;
use tertulia_session::SessionError;
use tertulia_store::StoreError;
use tertulia_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tertulia` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TertuliaError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (auth, identity mismatch, bad transition).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A registry-level error (user already in channel).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A store-level error (history backend unavailable).
    #[error(transparent)]
    Store(#[from] StoreError),
}
