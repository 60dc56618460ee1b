//! Error types for registration and delivery.

use tertulia_protocol::ProtocolError;

/// Errors from membership operations on the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The user name is already taken by a live session in that channel.
    /// First session wins; the newcomer is rejected.
    #[error("user {user:?} is already in channel {channel:?}")]
    AlreadyJoined { user: String, channel: String },
}

/// Errors from handing a frame to a single recipient.
///
/// Per-recipient failures are *contained*: the broadcast engine logs
/// them and moves on, they never surface to the sending session.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The event could not be serialized. This is a server-side bug or
    /// codec mismatch, not a peer problem, and it fails the whole
    /// broadcast before any frame goes out.
    #[error(transparent)]
    Encode(#[from] ProtocolError),

    /// The recipient's outbox is gone — its writer task has exited.
    /// The session is on its way out of the registry already.
    #[error("recipient outbox closed")]
    Closed,
}
