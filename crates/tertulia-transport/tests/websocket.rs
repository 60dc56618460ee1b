//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client to
//! verify that text frames actually flow over the network, that clean
//! closes surface as `None`, and that the split sink/stream halves allow
//! a send while a recv is parked.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tertulia_transport::{Connection, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a random port, connects one client, and returns both ends.
    async fn pair() -> (
        tertulia_transport::WebSocketConnection,
        ClientWs,
    ) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (client, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");

        (server.await.expect("accept task"), client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive_text_frames() {
        let (conn, mut client) = pair().await;

        assert!(conn.id().into_inner() > 0);

        conn.send("hello from server").await.expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "hello from server");

        client
            .send(Message::text("hello from client"))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(received, "hello from client");
    }

    #[tokio::test]
    async fn test_websocket_binary_json_frame_is_accepted() {
        // Some clients send JSON as binary frames; the transport should
        // hand it up as text all the same.
        let (conn, mut client) = pair().await;

        client
            .send(Message::Binary(b"{\"type\":\"typing\"}".to_vec().into()))
            .await
            .unwrap();

        let received = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(received, "{\"type\":\"typing\"}");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_blocked() {
        // A parked recv must not hold up sends on the same connection —
        // this is what per-half locking buys us.
        let (conn, mut client) = pair().await;
        let conn = Arc::new(conn);

        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };

        // Give the reader a moment to park on the stream lock.
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send("ping"))
            .await
            .expect("send should not be blocked by a pending recv")
            .expect("send should succeed");

        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "ping");

        // Unblock and join the reader.
        client.send(Message::text("done")).await.unwrap();
        let frame = reader.await.unwrap().expect("recv").expect("frame");
        assert_eq!(frame, "done");
    }
}
