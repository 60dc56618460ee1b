//! Per-connection handler: auth, join, and the chat event loop.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `auth` → verify token → Authenticated
//!   2. Receive `join` → check identity, register in channel → Joined
//!   3. Announce arrival, replay history to the newcomer
//!   4. Loop: receive events → broadcast / persist
//!   5. On any exit: deregister, announce departure exactly once
//!
//! A second task per connection — the writer — drains the session's
//! outbox queue onto the socket. The handler task never writes to the
//! socket after the join completes, so a peer that stops reading stalls
//! only its own writer, never a broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, timeout, timeout_at};

use tertulia_protocol::{ChatEvent, ClientEvent, Codec};
use tertulia_registry::ChannelMember;
use tertulia_session::{
    AuthProvider, Identity, SessionError, SessionLifecycle,
};
use tertulia_store::{MessageStore, StoredMessage};
use tertulia_transport::{Connection, WebSocketConnection};

use crate::TertuliaError;
use crate::server::{Outbox, ServerState};

/// How long a history replay may take before the session proceeds
/// without it.
const HISTORY_REPLAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<A, S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<A, S, C>>,
) -> Result<(), TertuliaError>
where
    A: AuthProvider,
    S: MessageStore,
    C: Codec,
{
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let mut lifecycle = SessionLifecycle::new();
    let result = drive(&conn, &state, &mut lifecycle).await;

    // Teardown runs on every exit path — clean close, protocol violation,
    // transport failure. `close()` yields the membership at most once and
    // `leave()` is true only on actual removal, so the departure is
    // announced exactly once no matter how the session ended.
    if let Some(joined) = lifecycle.close() {
        let registry = state.engine.registry();
        if registry.leave(&joined.channel, conn_id).await {
            let notice = ChatEvent::System {
                text: format!("{} ha salido", joined.identity.user),
            };
            if let Err(e) =
                state.engine.broadcast(&joined.channel, &notice).await
            {
                tracing::warn!(%conn_id, error = %e, "departure notice failed");
            }
            if let Err(e) =
                state.engine.broadcast_presence(&joined.channel).await
            {
                tracing::warn!(%conn_id, error = %e, "presence refresh failed");
            }
        }
    }

    // Best effort: the peer may already be gone.
    let _ = conn.close().await;

    result
}

/// Walks the connection through the lifecycle and runs the chat loop.
///
/// Returns `Ok(())` when the peer goes away cleanly at any stage; errors
/// are protocol violations or transport failures. Cleanup belongs to the
/// caller.
async fn drive<A, S, C>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<A, S, C>>,
    lifecycle: &mut SessionLifecycle,
) -> Result<(), TertuliaError>
where
    A: AuthProvider,
    S: MessageStore,
    C: Codec,
{
    // One deadline covers both the auth and the join wait: a connection
    // that hasn't made it into a channel by then is dropped.
    let deadline = Instant::now()
        + Duration::from_secs(state.config.auth_timeout_secs);

    let Some(identity) = await_auth(conn, state, deadline).await? else {
        return Ok(());
    };
    lifecycle.authenticate(identity.clone())?;

    let Some(channel) = await_join(conn, state, &identity, deadline).await?
    else {
        return Ok(());
    };

    // The lifecycle moves first so that teardown sees the membership even
    // if registration fails; `leave()` reporting false then suppresses
    // the departure broadcasts for a member that never got in.
    lifecycle.join(channel.clone())?;

    let (outbox, queue) = mpsc::unbounded_channel();
    state
        .engine
        .registry()
        .join(
            &channel,
            ChannelMember {
                connection: conn.id(),
                identity: identity.clone(),
                sink: outbox.clone(),
            },
        )
        .await?;

    spawn_writer(Arc::clone(conn), queue);

    tracing::info!(
        id = %conn.id(),
        user = %identity.user,
        %channel,
        "session joined"
    );

    // Arrival announcements reach the newcomer too — they registered
    // before the broadcast.
    state
        .engine
        .broadcast(
            &channel,
            &ChatEvent::System {
                text: format!("{} se ha unido", identity.user),
            },
        )
        .await?;
    state.engine.broadcast_presence(&channel).await?;

    replay_history(state, &channel, &outbox).await;

    chat_loop(conn, state, &identity, &channel).await
}

/// Waits for the `auth` event and verifies the credential.
///
/// `Ok(None)` means the peer closed before authenticating — a clean
/// exit, not an error. Anything other than a well-formed `auth` as the
/// first event is fatal.
async fn await_auth<A, S, C>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<A, S, C>>,
    deadline: Instant,
) -> Result<Option<Identity>, TertuliaError>
where
    A: AuthProvider,
    S: MessageStore,
    C: Codec,
{
    let frame = match timeout_at(deadline, conn.recv()).await {
        Ok(Ok(Some(frame))) => frame,
        Ok(Ok(None)) => return Ok(None),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            return Err(SessionError::AuthFailed(
                "authentication timed out".into(),
            )
            .into());
        }
    };

    let token = match state.codec.decode::<ClientEvent>(&frame) {
        Ok(ClientEvent::Auth { token }) => token,
        Ok(other) => {
            tracing::debug!(
                id = %conn.id(),
                event = ?other,
                "closing: first event was not auth"
            );
            return Err(SessionError::AuthFailed(
                "first event must be auth".into(),
            )
            .into());
        }
        Err(e) => {
            tracing::debug!(id = %conn.id(), error = %e, "closing: bad auth frame");
            return Err(
                SessionError::AuthFailed("malformed auth event".into()).into()
            );
        }
    };

    let identity = state.auth.verify(&token).await?;
    tracing::debug!(id = %conn.id(), user = %identity.user, "authenticated");
    Ok(Some(identity))
}

/// Waits for a `join` event that matches the authenticated identity.
///
/// Out-of-place or malformed events in this phase are logged and
/// ignored; the peer may retry until the handshake window lapses. A
/// `join` claiming a different user or avatar is fatal — the credential
/// is authoritative.
async fn await_join<A, S, C>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<A, S, C>>,
    identity: &Identity,
    deadline: Instant,
) -> Result<Option<String>, TertuliaError>
where
    A: AuthProvider,
    S: MessageStore,
    C: Codec,
{
    loop {
        let frame = match timeout_at(deadline, conn.recv()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                return Err(SessionError::AuthFailed(
                    "join window elapsed".into(),
                )
                .into());
            }
        };

        match state.codec.decode::<ClientEvent>(&frame) {
            Ok(ClientEvent::Join {
                user,
                avatar,
                channel,
            }) => {
                if user != identity.user || avatar != identity.avatar {
                    return Err(SessionError::IdentityMismatch {
                        claimed: user,
                        authenticated: identity.user.clone(),
                    }
                    .into());
                }
                return Ok(Some(channel));
            }
            Ok(other) => {
                tracing::debug!(
                    id = %conn.id(),
                    event = ?other,
                    "ignoring event before join"
                );
            }
            Err(e) => {
                tracing::debug!(
                    id = %conn.id(),
                    error = %e,
                    "ignoring malformed frame before join"
                );
            }
        }
    }
}

/// Spawns the writer task: drains the session's outbox onto the socket
/// in queue order. Exits when the outbox closes (session teardown) or
/// the socket rejects a write.
fn spawn_writer(
    conn: Arc<WebSocketConnection>,
    mut queue: mpsc::UnboundedReceiver<String>,
) {
    tokio::spawn(async move {
        while let Some(frame) = queue.recv().await {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(
                    id = %conn.id(),
                    error = %e,
                    "writer stopping after send failure"
                );
                break;
            }
        }
    });
}

/// Replays recent channel history to the joining session only.
///
/// The store is an external system: a slow or failing backend degrades
/// the session (no history, a warning) but never blocks the join.
async fn replay_history<A, S, C>(
    state: &Arc<ServerState<A, S, C>>,
    channel: &str,
    outbox: &Outbox,
) where
    A: AuthProvider,
    S: MessageStore,
    C: Codec,
{
    let limit = state.history_limit.unwrap_or(usize::MAX);
    let fetched =
        timeout(HISTORY_REPLAY_TIMEOUT, state.store.recent(channel, limit))
            .await;

    match fetched {
        Ok(Ok(history)) => {
            let count = history.len();
            for message in history {
                if let Err(e) =
                    state.engine.send_to(outbox, &message.to_event())
                {
                    tracing::debug!(error = %e, "history replay cut short");
                    return;
                }
            }
            tracing::debug!(%channel, count, "history replayed");
        }
        Ok(Err(e)) => {
            tracing::warn!(%channel, error = %e, "history unavailable, joining without replay");
        }
        Err(_) => {
            tracing::warn!(%channel, "history replay timed out, joining without replay");
        }
    }
}

/// The joined-state event loop: everything here is non-fatal except the
/// transport failing underneath us.
async fn chat_loop<A, S, C>(
    conn: &Arc<WebSocketConnection>,
    state: &Arc<ServerState<A, S, C>>,
    identity: &Identity,
    channel: &str,
) -> Result<(), TertuliaError>
where
    A: AuthProvider,
    S: MessageStore,
    C: Codec,
{
    let idle_limit = state.config.idle_timeout_secs.map(Duration::from_secs);

    loop {
        let received = match idle_limit {
            Some(limit) => match timeout(limit, conn.recv()).await {
                Ok(r) => r,
                Err(_) => {
                    tracing::info!(
                        user = %identity.user,
                        %channel,
                        "idle session reaped"
                    );
                    return Ok(());
                }
            },
            None => conn.recv().await,
        };

        let frame = match received {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(user = %identity.user, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(user = %identity.user, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let event = match state.codec.decode::<ClientEvent>(&frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(
                    user = %identity.user,
                    error = %e,
                    "ignoring malformed frame"
                );
                continue;
            }
        };

        match event {
            ClientEvent::Message { text } => {
                if text.trim().is_empty() {
                    continue;
                }
                let outgoing = ChatEvent::UserMessage {
                    user: identity.user.clone(),
                    text: text.clone(),
                };
                state.engine.broadcast(channel, &outgoing).await?;

                // Broadcast first: persistence failures degrade history,
                // they never hold up live traffic.
                let record =
                    StoredMessage::text(channel, identity.user.clone(), text);
                if let Err(e) = state.store.append(record).await {
                    tracing::warn!(
                        %channel,
                        error = %e,
                        "failed to persist message"
                    );
                }
            }

            ClientEvent::Media { url, kind } => {
                if url.trim().is_empty() {
                    continue;
                }
                let outgoing = ChatEvent::Media {
                    user: identity.user.clone(),
                    url: url.clone(),
                    kind,
                };
                state.engine.broadcast(channel, &outgoing).await?;

                let record = StoredMessage::media(
                    channel,
                    identity.user.clone(),
                    url,
                    kind,
                );
                if let Err(e) = state.store.append(record).await {
                    tracing::warn!(
                        %channel,
                        error = %e,
                        "failed to persist media"
                    );
                }
            }

            ClientEvent::Typing => {
                // Everyone but the typist; echoing it back is noise.
                state
                    .engine
                    .broadcast_except(
                        channel,
                        &ChatEvent::Typing {
                            user: identity.user.clone(),
                        },
                        conn.id(),
                    )
                    .await?;
            }

            ClientEvent::Auth { .. } | ClientEvent::Join { .. } => {
                tracing::debug!(
                    user = %identity.user,
                    "ignoring out-of-place event in joined state"
                );
            }
        }
    }
}
