//! The channel membership registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};

use tertulia_session::Identity;
use tertulia_transport::ConnectionId;

use crate::{DeliveryError, RegistryError};

/// A non-blocking delivery handle for one session.
///
/// `deliver` must return without waiting on the peer: the intended
/// implementation is the sending half of an unbounded outbox channel,
/// drained by the session's writer task. That indirection is what lets
/// the broadcast engine fan out to a thousand members without awaiting
/// any of their sockets.
pub trait EventSink: Send + Sync + 'static {
    /// Queues one encoded frame for this session.
    ///
    /// # Errors
    /// [`DeliveryError::Closed`] if the session's outbox is gone.
    fn deliver(&self, frame: String) -> Result<(), DeliveryError>;
}

impl EventSink for mpsc::UnboundedSender<String> {
    fn deliver(&self, frame: String) -> Result<(), DeliveryError> {
        self.send(frame).map_err(|_| DeliveryError::Closed)
    }
}

/// One session's entry in a channel.
#[derive(Debug)]
pub struct ChannelMember<S> {
    /// The transport connection backing this session.
    pub connection: ConnectionId,
    /// The authenticated identity this session joined as.
    pub identity: Identity,
    /// Delivery handle for this session's outgoing frames.
    pub sink: S,
}

/// Members of one channel, behind that channel's own lock.
type Members<S> = Arc<Mutex<Vec<ChannelMember<S>>>>;

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// The authoritative record of who is in which channel.
///
/// Channels exist exactly while they have members: the first `join`
/// creates the channel, removal of the last member prunes it. There is
/// no separate create/destroy surface and no empty-channel state to
/// leak.
///
/// Locking is two-level. The outer [`RwLock`] guards the channel table
/// and is write-locked only to add or prune a channel entry; the inner
/// per-channel [`Mutex`] guards that channel's member list. No await
/// point inside either critical section touches the network.
#[derive(Debug)]
pub struct SessionRegistry<S> {
    channels: RwLock<HashMap<String, Members<S>>>,
}

impl<S> Default for SessionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SessionRegistry<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a session to a channel, creating the channel if needed.
    ///
    /// # Errors
    /// [`RegistryError::AlreadyJoined`] if a live member of the channel
    /// already carries the same user name. The existing session keeps
    /// its place; the caller closes the newcomer.
    pub async fn join(
        &self,
        channel: &str,
        member: ChannelMember<S>,
    ) -> Result<(), RegistryError> {
        loop {
            // The read guard is held across the push so a concurrent
            // prune (which needs the write lock) can't orphan the
            // member list between lookup and insert.
            {
                let channels = self.channels.read().await;
                if let Some(slot) = channels.get(channel) {
                    let mut members = slot.lock().await;
                    if members
                        .iter()
                        .any(|m| m.identity.user == member.identity.user)
                    {
                        return Err(RegistryError::AlreadyJoined {
                            user: member.identity.user.clone(),
                            channel: channel.to_owned(),
                        });
                    }
                    tracing::info!(
                        connection = %member.connection,
                        user = %member.identity.user,
                        %channel,
                        members = members.len() + 1,
                        "session joined channel"
                    );
                    members.push(member);
                    return Ok(());
                }
            }

            // Channel doesn't exist yet: create the entry, then retry
            // through the read path so the insert logic lives once.
            let mut channels = self.channels.write().await;
            channels
                .entry(channel.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new())));
        }
    }

    /// Removes a session from a channel.
    ///
    /// Returns `true` if the session was a member and has now been
    /// removed, `false` if it wasn't there (already removed, or never
    /// joined). Callers gate departure broadcasts on that `true` so
    /// cleanup racing itself announces a departure exactly once.
    pub async fn leave(&self, channel: &str, connection: ConnectionId) -> bool {
        let (removed, now_empty) = {
            let channels = self.channels.read().await;
            let Some(slot) = channels.get(channel) else {
                return false;
            };
            let mut members = slot.lock().await;
            let before = members.len();
            members.retain(|m| m.connection != connection);
            (members.len() != before, members.is_empty())
        };

        if removed {
            tracing::info!(%connection, %channel, "session left channel");
        }

        if now_empty {
            // Re-check under the write lock: a join may have slipped in
            // between dropping the guards above and acquiring this one.
            let mut channels = self.channels.write().await;
            if let Some(slot) = channels.get(channel) {
                if slot.lock().await.is_empty() {
                    channels.remove(channel);
                    tracing::debug!(%channel, "empty channel pruned");
                }
            }
        }

        removed
    }

    /// Returns the identities of everyone currently in the channel, in
    /// join order. Empty if the channel doesn't exist.
    pub async fn roster(&self, channel: &str) -> Vec<Identity> {
        let channels = self.channels.read().await;
        match channels.get(channel) {
            Some(slot) => {
                slot.lock().await.iter().map(|m| m.identity.clone()).collect()
            }
            None => Vec::new(),
        }
    }

    /// Returns the number of members in the channel.
    pub async fn member_count(&self, channel: &str) -> usize {
        let channels = self.channels.read().await;
        match channels.get(channel) {
            Some(slot) => slot.lock().await.len(),
            None => 0,
        }
    }

    /// Returns the number of live (non-empty) channels.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl<S: Clone> SessionRegistry<S> {
    /// Captures the channel's current recipients: connection IDs and
    /// cloned sinks. The locks are released before the caller delivers
    /// anything, so a member who leaves mid-broadcast may still receive
    /// that broadcast's frame — membership is checked at send time, not
    /// at arrival time.
    pub async fn snapshot(&self, channel: &str) -> Vec<(ConnectionId, S)> {
        let channels = self.channels.read().await;
        match channels.get(channel) {
            Some(slot) => slot
                .lock()
                .await
                .iter()
                .map(|m| (m.connection, m.sink.clone()))
                .collect(),
            None => Vec::new(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
