//! Wire protocol for Tertulia.
//!
//! This crate defines the "language" that chat clients and the server speak:
//!
//! - **Events** ([`ClientEvent`], [`ChatEvent`], [`UserEntry`],
//!   [`MediaKind`]) — the structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events are converted
//!   to and from text frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while doing so.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (text frames) and session
//! (identity and channel membership). It knows nothing about connections,
//! channels, or who is allowed to say what — it only knows shapes.
//!
//! ```text
//! Transport (frames) → Protocol (events) → Session (identity, channel)
//! ```

mod codec;
mod error;
mod events;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use events::{ChatEvent, ClientEvent, MediaKind, UserEntry};
