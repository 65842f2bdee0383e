use crate::helpers::backend::{Reply, spawn_backend};

use client_core::error::ipc::IpcError;
use client_core::ipc::{IpcBridge, PushEvent, WsBridge};

use common::ListenerKey;

use std::time::Duration;

use serde_json::json;

const TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Public API tests for the WebSocket transport
// These run against a real WebSocket server on an ephemeral port
// ============================================================================

/// **VALUE**: Verifies a request gets its decoded answer and a push-event sent before
/// the answer arrives on the event stream.
///
/// **WHY THIS MATTERS**: Both directions share one socket; neither may swallow the
/// other's frames.
///
/// **BUG THIS CATCHES**: Would catch the reader treating event frames as responses, or
/// the listener config failing to decode from the camelCase wire form.
#[tokio::test]
async fn given_backend_when_requesting_config_then_response_and_event_delivered() {
    // GIVEN: A backend that pushes an event before answering GetConfig
    let (url, _seen) = spawn_backend(|command| {
        assert_eq!(command["name"], "GetConfig");
        Reply::EventThenOk(
            json!({"type": "event", "name": "forwarder:Started", "data": "127.0.0.1:8080"}),
            json!({"listeners": [{"listen": "127.0.0.1:8080"}], "listenOnStart": true}),
        )
    })
    .await;
    let (bridge, mut events) = WsBridge::connect(&url, TIMEOUT).await.unwrap();

    // WHEN: Requesting the config
    let config = bridge.get_config().await.unwrap();

    // THEN: Config decoded, event forwarded
    assert_eq!(config.listeners[0].listen, ListenerKey::from("127.0.0.1:8080"));
    assert!(config.listen_on_start);
    assert_eq!(
        events.recv().await.unwrap(),
        PushEvent::ForwarderStarted(ListenerKey::from("127.0.0.1:8080"))
    );
}

/// **VALUE**: Verifies commands are framed as documented and a backend error surfaces
/// as `IpcError::Backend`.
///
/// **WHY THIS MATTERS**: The backend indexes forwarders positionally; the index must
/// reach it intact, and its rejection must reach the user.
///
/// **BUG THIS CATCHES**: Would catch a wrong `args` encoding or errors being dropped.
#[tokio::test]
async fn given_backend_rejecting_when_starting_forwarder_then_backend_error() {
    let (url, mut seen) = spawn_backend(|_| Reply::Error("tunnel index out of bound")).await;
    let (bridge, _events) = WsBridge::connect(&url, TIMEOUT).await.unwrap();

    let result = bridge.start_forwarder(3).await;

    match result {
        Err(IpcError::Backend { message, .. }) => {
            assert_eq!(message, "tunnel index out of bound");
        }
        other => panic!("Expected Backend error, got {other:?}"),
    }

    let frame = seen.recv().await.unwrap();
    assert_eq!(frame["type"], "request");
    assert_eq!(frame["command"], json!({"name": "StartForwarder", "args": 3}));
}

/// **VALUE**: Verifies the label update and node listing travel over the socket in the
/// backend's shape and decode their answer.
///
/// **WHY THIS MATTERS**: These two calls carry the only multi-argument request and the
/// only list-valued response of the contract.
///
/// **BUG THIS CATCHES**: Would catch the label sent as an object instead of
/// `[index, label]`, or the node list failing to decode.
#[tokio::test]
async fn given_backend_when_relabelling_and_listing_nodes_then_frames_and_answers_match() {
    let (url, mut seen) = spawn_backend(|command| match command["name"].as_str() {
        Some("GetConnectedForwarderNodes") => {
            Reply::Ok(json!([{"label": "db", "via": "gw-1.example:443"}]))
        }
        _ => Reply::Ok(json!(null)),
    })
    .await;
    let (bridge, _events) = WsBridge::connect(&url, TIMEOUT).await.unwrap();

    bridge
        .update_forwarder_label(1, String::from("db"))
        .await
        .unwrap();
    let nodes = bridge.connected_forwarder_nodes().await.unwrap();

    let frame = seen.recv().await.unwrap();
    assert_eq!(
        frame["command"],
        json!({"name": "UpdateForwaderLabel", "args": [1, "db"]})
    );
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].label, "db");
    assert_eq!(nodes[0].via, "gw-1.example:443");
}

/// **VALUE**: Verifies the ready signal is sent as a signal frame.
///
/// **WHY THIS MATTERS**: Without it the backend never starts pushing state.
///
/// **BUG THIS CATCHES**: Would catch the signal being sent as a request expecting an
/// answer.
#[tokio::test]
async fn given_connected_bridge_when_signalling_ready_then_backend_sees_signal() {
    let (url, mut seen) = spawn_backend(|_| Reply::Ok(json!(null))).await;
    let (bridge, _events) = WsBridge::connect(&url, TIMEOUT).await.unwrap();

    bridge.signal_ready().unwrap();

    let frame = tokio::time::timeout(TIMEOUT, seen.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame, json!({"type": "signal", "name": "broker:Ready"}));
}

/// **VALUE**: Verifies an unanswered request fails with `Timeout` after the configured
/// duration.
///
/// **WHY THIS MATTERS**: A hung backend must not keep a control in `loading` forever.
///
/// **BUG THIS CATCHES**: Would catch requests awaiting without a deadline.
#[tokio::test]
async fn given_silent_backend_when_requesting_then_times_out() {
    let (url, _seen) = spawn_backend(|_| Reply::Silent).await;
    let (bridge, _events) = WsBridge::connect(&url, Duration::from_millis(100))
        .await
        .unwrap();

    let result = bridge.connected_status().await;

    assert!(matches!(result, Err(IpcError::Timeout { .. })));
}

/// **VALUE**: Verifies a socket closed by the backend fails the pending request and
/// every later one with `Closed`, and ends the event stream.
///
/// **WHY THIS MATTERS**: After a backend crash the UI must recover to idle controls.
///
/// **BUG THIS CATCHES**: Would catch pending requests hanging after the reader exits.
#[tokio::test]
async fn given_backend_closing_when_requesting_then_closed_error() {
    let (url, _seen) = spawn_backend(|_| Reply::Close).await;
    let (bridge, mut events) = WsBridge::connect(&url, TIMEOUT).await.unwrap();

    let pending = bridge.all_forwarders_started().await;
    assert!(matches!(pending, Err(IpcError::Closed { .. })));

    assert!(events.recv().await.is_none());
    assert!(bridge.is_closed());
    assert!(matches!(
        bridge.stop_client().await,
        Err(IpcError::Closed { .. })
    ));
}

/// **VALUE**: Verifies malformed or non-WebSocket URLs are rejected before dialing.
///
/// **WHY THIS MATTERS**: A config pointing at `http://` should fail with a clear
/// message, not a handshake error.
///
/// **BUG THIS CATCHES**: Would catch the scheme check being skipped.
#[tokio::test]
async fn given_invalid_url_when_connecting_then_connect_error() {
    for url in ["not a url", "http://127.0.0.1:19876"] {
        let result = WsBridge::connect(url, TIMEOUT).await;
        assert!(
            matches!(result, Err(IpcError::Connect { .. })),
            "url {url} was accepted"
        );
    }
}
