// Unit tests for inbound frame routing in the WebSocket bridge

use crate::error::ipc::IpcError;
use crate::ipc::protocol::PushEvent;
use crate::ipc::ws_bridge::{PendingRequests, route_frame};

use common::ListenerKey;

use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};

fn waiter(pending: &PendingRequests, id: u64) -> oneshot::Receiver<Result<Value, IpcError>> {
    let (tx, rx) = oneshot::channel();
    pending.insert(id, tx);
    rx
}

/// **VALUE**: Verifies a response frame completes exactly the request with its id.
///
/// **WHY THIS MATTERS**: Several requests may be outstanding at once (a status query
/// while a start command is in flight). Crossing answers would start the wrong forwarder.
///
/// **BUG THIS CATCHES**: Would catch routing by arrival order instead of by id.
#[test]
fn given_two_pending_requests_when_response_arrives_then_only_matching_one_completes() {
    // GIVEN: Requests 1 and 2 pending
    let pending = PendingRequests::default();
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let mut first = waiter(&pending, 1);
    let mut second = waiter(&pending, 2);

    // WHEN: The answer for 2 arrives
    route_frame(
        r#"{"type":"response","id":2,"ok":true}"#,
        &pending,
        &events_tx,
    );

    // THEN: 2 is completed with its value, 1 still waits
    let reply = second.try_recv().unwrap().unwrap();
    assert_eq!(reply, json!(true));
    assert!(first.try_recv().is_err());
    assert_eq!(pending.len(), 1);
}

/// **VALUE**: Verifies an error response surfaces as `IpcError::Backend` with the
/// backend's message.
///
/// **WHY THIS MATTERS**: The message ends up in the user-visible alert
/// ("Failed to start forwarder ...: tunnel index out of bound").
///
/// **BUG THIS CATCHES**: Would catch error responses being treated as success with a
/// null value.
#[test]
fn given_error_response_when_routed_then_waiter_gets_backend_error() {
    // GIVEN: One pending request
    let pending = PendingRequests::default();
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let mut rx = waiter(&pending, 7);

    // WHEN: The backend rejects it
    route_frame(
        r#"{"type":"response","id":7,"error":"tunnel index out of bound"}"#,
        &pending,
        &events_tx,
    );

    // THEN: The waiter receives the backend's message
    match rx.try_recv().unwrap() {
        Err(IpcError::Backend { message, .. }) => {
            assert_eq!(message, "tunnel index out of bound");
        }
        other => panic!("Expected Backend error, got {other:?}"),
    }
}

/// **VALUE**: Verifies a unit response (no `ok` field) completes with `null`.
///
/// **WHY THIS MATTERS**: Commands like `StartForwarder` return nothing; the backend may
/// omit `ok` entirely.
///
/// **BUG THIS CATCHES**: Would catch a missing `ok` being treated as a protocol error.
#[test]
fn given_response_without_ok_when_routed_then_completes_with_null() {
    let pending = PendingRequests::default();
    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let mut rx = waiter(&pending, 3);

    route_frame(r#"{"type":"response","id":3}"#, &pending, &events_tx);

    assert_eq!(rx.try_recv().unwrap().unwrap(), Value::Null);
}

/// **VALUE**: Verifies event frames are forwarded to the push-event stream, decoded.
///
/// **WHY THIS MATTERS**: Every state change the UI shows arrives this way.
///
/// **BUG THIS CATCHES**: Would catch the payload being lost for per-listener events.
#[test]
fn given_event_frame_when_routed_then_forwarded_to_stream() {
    // GIVEN: No pending requests
    let pending = PendingRequests::default();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();

    // WHEN: Two events arrive
    route_frame(
        r#"{"type":"event","name":"forwarder:Started","data":"127.0.0.1:8080"}"#,
        &pending,
        &events_tx,
    );
    route_frame(
        r#"{"type":"event","name":"specter:Connecting"}"#,
        &pending,
        &events_tx,
    );

    // THEN: Both are on the stream, in order
    assert_eq!(
        events_rx.try_recv().unwrap(),
        PushEvent::ForwarderStarted(ListenerKey::from("127.0.0.1:8080"))
    );
    assert_eq!(events_rx.try_recv().unwrap(), PushEvent::ClientConnecting);
}

/// **VALUE**: Verifies junk, unknown events and unknown ids are dropped without effect.
///
/// **WHY THIS MATTERS**: A newer backend may push events this client does not know.
/// The reader loop must keep running.
///
/// **BUG THIS CATCHES**: Would catch a panic on undecodable input, or a stray response
/// completing the wrong waiter.
#[test]
fn given_unroutable_frames_when_routed_then_dropped() {
    // GIVEN: Request 1 pending
    let pending = PendingRequests::default();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut rx = waiter(&pending, 1);

    // WHEN: Routing garbage, an unknown event and a response for id 99
    route_frame("not json", &pending, &events_tx);
    route_frame(
        r#"{"type":"event","name":"tunnel:Unknown"}"#,
        &pending,
        &events_tx,
    );
    route_frame(r#"{"type":"response","id":99,"ok":1}"#, &pending, &events_tx);

    // THEN: Nothing was delivered anywhere
    assert!(events_rx.try_recv().is_err());
    assert!(rx.try_recv().is_err());
    assert_eq!(pending.len(), 1);
}

/// **VALUE**: Verifies closing the bridge fails every pending request with `Closed`.
///
/// **WHY THIS MATTERS**: A controller awaiting a command must leave `loading` when the
/// backend goes away instead of hanging.
///
/// **BUG THIS CATCHES**: Would catch waiters being dropped silently (mapped to a
/// different error) or left in the map.
#[test]
fn given_pending_requests_when_failed_all_then_each_gets_closed() {
    let pending = PendingRequests::default();
    let mut a = waiter(&pending, 1);
    let mut b = waiter(&pending, 2);

    pending.fail_all();

    assert!(matches!(a.try_recv().unwrap(), Err(IpcError::Closed { .. })));
    assert!(matches!(b.try_recv().unwrap(), Err(IpcError::Closed { .. })));
    assert_eq!(pending.len(), 0);
}
