//! Message history for Tertulia.
//!
//! Persistence is a plug-in concern: the server appends every chat
//! message through [`MessageStore`] and replays recent history to
//! newcomers, but nothing in the realtime path *depends* on the store
//! being healthy. A store failure degrades the session (no history, a
//! logged warning) — it never blocks live traffic.
//!
//! [`MemoryStore`] is the bundled implementation: process-local,
//! unbounded by default, good for demos and tests. A production
//! deployment implements [`MessageStore`] over its own database.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use tertulia_protocol::{ChatEvent, MediaKind};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The payload of a stored message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// A plain text chat line.
    Text { text: String },
    /// A shared image or gif, stored by URL.
    Media { url: String, kind: MediaKind },
}

/// One message as the store keeps it.
///
/// Timestamps are assigned by the server at append time, not by
/// clients — replay order is the server's arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// The channel the message was sent to.
    pub channel: String,
    /// The sender's user name.
    pub user: String,
    /// What was sent.
    pub body: MessageBody,
    /// Server-side arrival time.
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    /// Stamps a text message with the current time.
    pub fn text(
        channel: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            body: MessageBody::Text { text: text.into() },
            created_at: Utc::now(),
        }
    }

    /// Stamps a media message with the current time.
    pub fn media(
        channel: impl Into<String>,
        user: impl Into<String>,
        url: impl Into<String>,
        kind: MediaKind,
    ) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            body: MessageBody::Media {
                url: url.into(),
                kind,
            },
            created_at: Utc::now(),
        }
    }

    /// Converts the record back into the wire event a replay sends. The
    /// frame a newcomer receives for a historical message is shaped
    /// exactly like the one live members saw.
    pub fn to_event(&self) -> ChatEvent {
        match &self.body {
            MessageBody::Text { text } => ChatEvent::UserMessage {
                user: self.user.clone(),
                text: text.clone(),
            },
            MessageBody::Media { url, kind } => ChatEvent::Media {
                user: self.user.clone(),
                url: url.clone(),
                kind: *kind,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// MessageStore
// ---------------------------------------------------------------------------

/// Append-only message history, queried per channel.
///
/// Treated as a potentially slow external system: calls are awaited off
/// the broadcast path and their failures are contained by the caller.
/// Returned futures are `Send` because connection handlers run on a
/// multithreaded runtime.
pub trait MessageStore: Send + Sync + 'static {
    /// Persists one message.
    fn append(
        &self,
        message: StoredMessage,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Returns up to `limit` of the channel's most recent messages,
    /// oldest first — the order a replay sends them in.
    fn recent(
        &self,
        channel: &str,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<StoredMessage>, StoreError>>
    + Send;
}

/// Errors from the history backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}
