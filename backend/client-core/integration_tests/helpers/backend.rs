//! Minimal WebSocket backend speaking the JSON frame protocol.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// What the fake backend does with each inbound request.
pub enum Reply {
    Ok(Value),
    Error(&'static str),
    /// Push this event frame first, then answer with `ok`.
    EventThenOk(Value, Value),
    /// Never answer.
    Silent,
    /// Close the socket.
    Close,
}

/// Start a backend on an ephemeral port accepting one connection.
///
/// `reply` decides the answer for each request's `command` object. Every
/// inbound frame is also forwarded to the returned receiver.
pub async fn spawn_backend<F>(reply: F) -> (String, mpsc::UnboundedReceiver<Value>)
where
    F: Fn(&Value) -> Reply + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test backend");
    let port = listener.local_addr().unwrap().port();
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept failed");
        let mut ws = accept_async(stream).await.expect("handshake failed");

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let frame: Value = serde_json::from_str(text.as_str()).expect("client sent bad JSON");
            let _ = seen_tx.send(frame.clone());

            if frame["type"] != "request" {
                continue;
            }

            let id = frame["id"].clone();
            let response = match reply(&frame["command"]) {
                Reply::Ok(value) => json!({"type": "response", "id": id, "ok": value}),
                Reply::Error(message) => json!({"type": "response", "id": id, "error": message}),
                Reply::EventThenOk(event, value) => {
                    let _ = ws.send(Message::Text(event.to_string().into())).await;
                    json!({"type": "response", "id": id, "ok": value})
                }
                Reply::Silent => continue,
                Reply::Close => {
                    let _ = ws.close(None).await;
                    break;
                }
            };

            if ws.send(Message::Text(response.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    (format!("ws://127.0.0.1:{port}"), seen_rx)
}
