//! Channel-wide event fan-out.

use std::sync::Arc;

use tertulia_protocol::{ChatEvent, Codec, ProtocolError, UserEntry};
use tertulia_transport::ConnectionId;

use crate::{EventSink, SessionRegistry};

/// Fans one event out to every member of a channel.
///
/// The engine does three things, in order: encode the event exactly once,
/// snapshot the channel's membership (releasing all registry locks), then
/// hand the shared frame to each member's [`EventSink`]. Delivery is
/// synchronous and non-blocking — sinks are outbox senders, never
/// sockets — so a broadcast's cost is one serialization plus N channel
/// pushes, regardless of how slow any recipient's connection is.
///
/// A sink that fails is logged and skipped. The encode step is the only
/// way a broadcast itself can fail.
#[derive(Debug)]
pub struct BroadcastEngine<C, S> {
    codec: C,
    registry: Arc<SessionRegistry<S>>,
}

impl<C, S> BroadcastEngine<C, S>
where
    C: Codec,
    S: EventSink + Clone,
{
    /// Creates an engine over the given registry.
    pub fn new(codec: C, registry: Arc<SessionRegistry<S>>) -> Self {
        Self { codec, registry }
    }

    /// The registry this engine fans out over.
    pub fn registry(&self) -> &Arc<SessionRegistry<S>> {
        &self.registry
    }

    /// Sends the event to every member of the channel.
    ///
    /// Returns the number of members the frame was queued for. A missing
    /// channel is not an error — it delivers to zero members.
    pub async fn broadcast(
        &self,
        channel: &str,
        event: &ChatEvent,
    ) -> Result<usize, ProtocolError> {
        self.dispatch(channel, event, None).await
    }

    /// Sends the event to every member of the channel except one
    /// connection — the shape used for typing indicators, where echoing
    /// the sender's own activity back is noise.
    pub async fn broadcast_except(
        &self,
        channel: &str,
        event: &ChatEvent,
        skip: ConnectionId,
    ) -> Result<usize, ProtocolError> {
        self.dispatch(channel, event, Some(skip)).await
    }

    /// Builds a `connectedUsers` roster from the registry's current
    /// membership and broadcasts it to the whole channel. Called after
    /// every arrival and departure so clients converge on the same
    /// presence list.
    pub async fn broadcast_presence(
        &self,
        channel: &str,
    ) -> Result<usize, ProtocolError> {
        let users: Vec<UserEntry> = self
            .registry
            .roster(channel)
            .await
            .into_iter()
            .map(|id| UserEntry {
                user: id.user,
                avatar: id.avatar,
            })
            .collect();
        self.broadcast(channel, &ChatEvent::ConnectedUsers { users }).await
    }

    /// Encodes the event and queues it for a single recipient — the
    /// unicast path used for history replay and direct notices, where
    /// only one session should see the frame.
    pub fn send_to(
        &self,
        sink: &S,
        event: &ChatEvent,
    ) -> Result<(), crate::DeliveryError> {
        let frame = self.codec.encode(event)?;
        sink.deliver(frame)
    }

    async fn dispatch(
        &self,
        channel: &str,
        event: &ChatEvent,
        skip: Option<ConnectionId>,
    ) -> Result<usize, ProtocolError> {
        // Encode once; every recipient gets a clone of the same frame.
        let frame = self.codec.encode(event)?;
        let recipients = self.registry.snapshot(channel).await;

        let mut delivered = 0;
        for (connection, sink) in recipients {
            if skip == Some(connection) {
                continue;
            }
            match sink.deliver(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(err) => {
                    // The session is already tearing down; its own
                    // handler deregisters it. Nothing to do but skip.
                    tracing::warn!(
                        %connection,
                        %channel,
                        error = %err,
                        "skipping unreachable recipient"
                    );
                }
            }
        }

        tracing::trace!(%channel, delivered, "event fanned out");
        Ok(delivered)
    }
}

// =========================================================================
// Tests
// =========================================================================
