//! A runnable chat room server with static dev tokens and in-memory
//! history.
//!
//! Start it, then connect with any WebSocket client and speak the wire
//! protocol:
//!
//! ```text
//! → {"type":"auth","token":"dev-alice"}
//! → {"type":"join","user":"alice","avatar":"🐶","channel":"general"}
//! ← {"type":"system","text":"alice se ha unido"}
//! ← {"type":"connectedUsers","users":[{"user":"alice","avatar":"🐶"}]}
//! → {"type":"message","text":"hola"}
//! ← {"type":"message","user":"alice","text":"hola"}
//! ```
//!
//! Set `RUST_LOG` to adjust verbosity (e.g. `RUST_LOG=tertulia=debug`).

use tertulia::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut auth = StaticAuthProvider::new();
    auth.issue("dev-alice", "alice", "🐶");
    auth.issue("dev-bob", "bob", "🐱");
    auth.issue("dev-carol", "carol", "🦊");
    tracing::info!("dev tokens: dev-alice, dev-bob, dev-carol");

    let server = TertuliaServerBuilder::new()
        .bind("127.0.0.1:8080")
        .build(auth, MemoryStore::new())
        .await?;

    tracing::info!(addr = %server.local_addr()?, "chat-room demo listening");
    server.run().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tertulia::prelude::*;
    use tokio_tungstenite::tungstenite::Message;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn start() -> String {
        let mut auth = StaticAuthProvider::new();
        auth.issue("dev-alice", "alice", "🐶");
        auth.issue("dev-bob", "bob", "🐱");

        let server = TertuliaServerBuilder::new()
            .bind("127.0.0.1:0")
            .build(auth, MemoryStore::new())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let _ = server.run().await;
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        addr
    }

    async fn ws(addr: &str) -> Ws {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        ws
    }

    async fn send(ws: &mut Ws, event: Value) {
        ws.send(Message::text(event.to_string())).await.unwrap();
    }

    async fn recv(ws: &mut Ws) -> Value {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        serde_json::from_str(msg.to_text().unwrap()).unwrap()
    }

    // One end-to-end conversation: two users join, chat, and part.
    #[tokio::test]
    async fn test_two_user_conversation() {
        let addr = start().await;

        let mut alice = ws(&addr).await;
        send(&mut alice, json!({"type": "auth", "token": "dev-alice"})).await;
        send(
            &mut alice,
            json!({"type": "join", "user": "alice", "avatar": "🐶", "channel": "general"}),
        )
        .await;
        assert_eq!(recv(&mut alice).await["text"], "alice se ha unido");
        assert_eq!(recv(&mut alice).await["type"], "connectedUsers");

        let mut bob = ws(&addr).await;
        send(&mut bob, json!({"type": "auth", "token": "dev-bob"})).await;
        send(
            &mut bob,
            json!({"type": "join", "user": "bob", "avatar": "🐱", "channel": "general"}),
        )
        .await;
        assert_eq!(recv(&mut bob).await["text"], "bob se ha unido");
        assert_eq!(recv(&mut bob).await["type"], "connectedUsers");

        // Alice sees bob arrive.
        assert_eq!(recv(&mut alice).await["text"], "bob se ha unido");
        assert_eq!(recv(&mut alice).await["type"], "connectedUsers");

        // A message reaches both.
        send(&mut bob, json!({"type": "message", "text": "buenas"})).await;
        let expected = json!({"type": "message", "user": "bob", "text": "buenas"});
        assert_eq!(recv(&mut alice).await, expected);
        assert_eq!(recv(&mut bob).await, expected);

        // Bob leaves; alice hears about it.
        bob.close(None).await.unwrap();
        assert_eq!(recv(&mut alice).await["text"], "bob ha salido");
        assert_eq!(recv(&mut alice).await["type"], "connectedUsers");
    }
}
