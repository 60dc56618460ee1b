//! The event types that travel on the wire.
//!
//! Two separate enums, one per direction. Client SDKs only ever produce
//! [`ClientEvent`] and consume [`ChatEvent`]; keeping the directions apart
//! means the server can never accidentally echo a client frame verbatim,
//! and a client can never forge a server-attributed event — the `user`
//! field on server events is always filled in from the authenticated
//! identity, never taken from the frame.
//!
//! Both enums are internally tagged (`{"type": ...}`) with camelCase tags,
//! matching what browser clients expect to read in DevTools.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// The kind of a media attachment.
///
/// Serialized lowercase: `"image"` / `"gif"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// A static image, referenced by URL.
    Image,
    /// An animated GIF, referenced by URL.
    Gif,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Gif => write!(f, "gif"),
        }
    }
}

// ---------------------------------------------------------------------------
// UserEntry
// ---------------------------------------------------------------------------

/// One entry in a `connectedUsers` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// The user's name (unique within a channel).
    pub user: String,
    /// The user's avatar (emoji or URL — opaque to the server).
    pub avatar: String,
}

// ---------------------------------------------------------------------------
// ClientEvent — client → server
// ---------------------------------------------------------------------------

/// An event sent by a client.
///
/// Which events are *accepted* depends on the session's state; that policy
/// lives in the session layer. Decoding an unknown `"type"` tag fails —
/// whether that failure is fatal (unauthenticated) or ignored (joined) is
/// likewise the session layer's call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Present a credential. The only event accepted before authentication.
    Auth { token: String },

    /// Enter a channel. `user` and `avatar` are redundant — they must match
    /// the identity the credential resolved to.
    Join {
        user: String,
        avatar: String,
        channel: String,
    },

    /// Say something to the channel.
    Message { text: String },

    /// The client is composing a message.
    Typing,

    /// Share a media attachment with the channel.
    Media { url: String, kind: MediaKind },
}

// ---------------------------------------------------------------------------
// ChatEvent — server → client
// ---------------------------------------------------------------------------

/// An event originated by the server and fanned out to channel members.
///
/// Immutable once constructed; the broadcast path encodes a `ChatEvent`
/// exactly once and delivers the same frame to every recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatEvent {
    /// A server notice ("alice joined", "bob left").
    System { text: String },

    /// A chat message attributed to a user.
    #[serde(rename = "message")]
    UserMessage { user: String, text: String },

    /// A user is composing. Never delivered back to its originator.
    Typing { user: String },

    /// Point-in-time membership snapshot, in join order.
    ConnectedUsers { users: Vec<UserEntry> },

    /// A media attachment attributed to a user.
    Media {
        user: String,
        url: String,
        kind: MediaKind,
    },
}

// =========================================================================
// Tests
// =========================================================================
