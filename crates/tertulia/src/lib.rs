//! # Tertulia
//!
//! A realtime group-chat backend: authenticated WebSocket sessions,
//! per-channel membership, ordered broadcast fan-out, and pluggable
//! message history.
//!
//! Implement [`AuthProvider`](tertulia_session::AuthProvider) for your
//! credential scheme and [`MessageStore`](tertulia_store::MessageStore)
//! for your history backend (or use the bundled `StaticAuthProvider` and
//! `MemoryStore` for development), then:
//!
//! ```rust,no_run
//! use tertulia::prelude::*;
//!
//! # async fn run() -> Result<(), TertuliaError> {
//! let mut auth = StaticAuthProvider::new();
//! auth.issue("dev-token", "alice", "🐶");
//!
//! let server = TertuliaServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(auth, MemoryStore::new())
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::TertuliaError;
pub use server::{TertuliaServer, TertuliaServerBuilder};

/// Everything needed to stand up a server.
pub mod prelude {
    pub use tertulia_protocol::{
        ChatEvent, ClientEvent, JsonCodec, MediaKind, UserEntry,
    };
    pub use tertulia_session::{
        AuthProvider, Identity, SessionConfig, StaticAuthProvider,
    };
    pub use tertulia_store::{MemoryStore, MessageStore, StoredMessage};

    pub use crate::error::TertuliaError;
    pub use crate::server::{TertuliaServer, TertuliaServerBuilder};
}
