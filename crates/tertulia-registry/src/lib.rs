//! Channel membership and fan-out for Tertulia.
//!
//! Two pieces live here:
//!
//! - [`SessionRegistry`] — the authoritative map of who is in which
//!   channel. Fine-grained locking: a [`tokio::sync::RwLock`] over the
//!   channel table, one [`tokio::sync::Mutex`] per channel's member
//!   list, so traffic in one channel never contends with another.
//! - [`BroadcastEngine`] — encodes an event **once** per broadcast,
//!   snapshots the channel's membership, and hands the frame to every
//!   member's [`EventSink`]. A sink that has gone away is logged and
//!   skipped; one dead peer never stalls or fails the rest.
//!
//! Neither piece performs network I/O. An `EventSink` is expected to be
//! the sending half of a per-session outbox (an unbounded channel
//! drained by that session's writer task), which is what keeps
//! `deliver` synchronous and non-blocking and preserves per-recipient
//! ordering.

mod broadcast;
mod error;
mod registry;

pub use broadcast::BroadcastEngine;
pub use error::{DeliveryError, RegistryError};
pub use registry::{ChannelMember, EventSink, SessionRegistry};
