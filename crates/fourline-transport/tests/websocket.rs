//! Loopback tests for the WebSocket transport.

use fourline_transport::{Connection, Transport, WebSocketTransport};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

async fn bound_transport() -> (WebSocketTransport, String) {
    let transport = WebSocketTransport::bind("127.0.0.1:0")
        .await
        .expect("bind on loopback");
    let addr = transport.local_addr().expect("local addr");
    (transport, format!("ws://{addr}"))
}

#[tokio::test]
async fn test_accept_and_exchange_text_frames() {
    let (mut transport, url) = bound_transport().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client connect");
        ws.send(Message::Text("hello".into())).await.unwrap();
        let reply = ws.next().await.expect("reply frame").expect("ws error");
        assert_eq!(reply, Message::Text("welcome".into()));
        ws.close(None).await.unwrap();
    });

    let conn = transport.accept().await.expect("accept");
    let frame = conn.recv().await.expect("recv").expect("open frame");
    assert_eq!(frame, b"hello");

    conn.send(b"welcome").await.expect("send");

    // Clean client close surfaces as None, not an error.
    assert!(conn.recv().await.expect("recv after close").is_none());
    client.await.unwrap();
}

#[tokio::test]
async fn test_connection_ids_are_unique() {
    let (mut transport, url) = bound_transport().await;

    let url2 = url.clone();
    let c1 = tokio::spawn(async move {
        tokio_tungstenite::connect_async(url).await.expect("connect")
    });
    let first = transport.accept().await.expect("accept first");
    c1.await.unwrap();

    let c2 = tokio::spawn(async move {
        tokio_tungstenite::connect_async(url2).await.expect("connect")
    });
    let second = transport.accept().await.expect("accept second");
    c2.await.unwrap();

    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn test_send_while_blocked_in_recv() {
    // The handler's forwarding task must be able to push frames out
    // while another task sits in recv on the same connection.
    let (mut transport, url) = bound_transport().await;

    let client = tokio::spawn(async move {
        let (mut ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client connect");
        let frame = ws.next().await.expect("frame").expect("ws error");
        assert_eq!(frame, Message::Text("pushed".into()));
        ws.close(None).await.unwrap();
    });

    let conn = transport.accept().await.expect("accept");
    let reader = conn.clone();
    let recv_task = tokio::spawn(async move { reader.recv().await });

    conn.send(b"pushed").await.expect("send during recv");

    // recv resolves once the client closes.
    let received = recv_task.await.unwrap().expect("recv result");
    assert!(received.is_none());
    client.await.unwrap();
}
