//! `TertuliaServer` builder and accept loop.
//!
//! This is the entry point for running a Tertulia chat server. It ties
//! together all the layers: transport → protocol → session → registry →
//! store.

use std::sync::Arc;

use tokio::sync::mpsc;

use tertulia_protocol::{Codec, JsonCodec};
use tertulia_registry::{BroadcastEngine, SessionRegistry};
use tertulia_session::{AuthProvider, SessionConfig};
use tertulia_store::MessageStore;
use tertulia_transport::{Transport, WebSocketTransport};

use crate::TertuliaError;
use crate::handler::handle_connection;

/// Each session's outbound queue: pre-encoded frames, drained in order
/// by that session's writer task.
pub(crate) type Outbox = mpsc::UnboundedSender<String>;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// registry lives inside the broadcast engine; handlers reach it through
/// [`BroadcastEngine::registry`].
pub(crate) struct ServerState<A, S, C: Codec> {
    pub(crate) auth: A,
    pub(crate) store: S,
    pub(crate) codec: C,
    pub(crate) engine: BroadcastEngine<C, Outbox>,
    pub(crate) config: SessionConfig,
    pub(crate) history_limit: Option<usize>,
}

/// Builder for configuring and starting a Tertulia server.
///
/// # Example
///
/// ```rust,ignore
/// use tertulia::prelude::*;
///
/// let server = TertuliaServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .build(my_auth, my_store)
///     .await?;
/// server.run().await
/// ```
pub struct TertuliaServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
    history_limit: Option<usize>,
}

impl TertuliaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
            history_limit: None,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Caps how many stored messages are replayed to a joining session.
    /// Replay is unbounded unless a cap is set.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Builds and starts the server with the given auth provider and
    /// message store.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport` as defaults.
    pub async fn build<A, S>(
        self,
        auth: A,
        store: S,
    ) -> Result<TertuliaServer<A, S, JsonCodec>, TertuliaError>
    where
        A: AuthProvider,
        S: MessageStore,
    {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let registry = Arc::new(SessionRegistry::new());
        let state = Arc::new(ServerState {
            auth,
            store,
            codec: JsonCodec,
            engine: BroadcastEngine::new(JsonCodec, registry),
            config: self.session_config,
            history_limit: self.history_limit,
        });

        Ok(TertuliaServer { transport, state })
    }
}

impl Default for TertuliaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Tertulia chat server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TertuliaServer<A, S, C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, S, C>>,
}

impl<A, S, C> TertuliaServer<A, S, C>
where
    A: AuthProvider,
    S: MessageStore,
    C: Codec + Clone,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), TertuliaError> {
        tracing::info!("Tertulia server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
