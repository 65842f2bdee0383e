use crate::helpers::MockBridge;

use client_core::broker::{EventBroker, Subscription};
use client_core::broker::topics::{
    ClientConnected, ClientConnecting, ClientDisconnected, ForwarderStarted, ForwardersStarted,
    ForwardersStarting, ForwardersStopped,
};
use client_core::ipc::{EnvironmentInfo, IpcCommand, PushEvent};
use client_core::store::{
    AggregateForwardersState, AlertLevel, AlertStore, ConnectionState, Runtime,
};

use common::ListenerKey;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn runtime(bridge: &Arc<MockBridge>) -> Runtime<MockBridge> {
    Runtime::new(Arc::clone(bridge), EventBroker::new(), AlertStore::new())
}

/// Record the wire names of connection topics as they are published.
fn record_connection_topics(
    broker: &EventBroker,
) -> (Arc<Mutex<Vec<&'static str>>>, Vec<Subscription>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriptions = vec![
        {
            let seen = Arc::clone(&seen);
            broker.subscribe::<ClientConnecting, _>(move |_| seen.lock().unwrap().push("connecting"))
        },
        {
            let seen = Arc::clone(&seen);
            broker.subscribe::<ClientConnected, _>(move |_| seen.lock().unwrap().push("connected"))
        },
        {
            let seen = Arc::clone(&seen);
            broker.subscribe::<ClientDisconnected, _>(move |_| {
                seen.lock().unwrap().push("disconnected")
            })
        },
    ];
    (seen, subscriptions)
}

// ----------------------------------------------------------------------------
// Connection State Store
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the connect flow ends `Connected` with exactly two broker
/// publishes.
///
/// **WHY THIS MATTERS**: Status views render from these topics; a missing or extra
/// publish shows the wrong indicator.
///
/// **BUG THIS CATCHES**: Would catch the store publishing before updating, or
/// publishing twice per transition.
#[test]
fn given_disconnected_when_connecting_then_connected_then_two_publishes() {
    // GIVEN: A runtime and a subscriber registered beforehand
    let bridge = MockBridge::with_listeners(&[]);
    let runtime = runtime(&bridge);
    let (seen, _subscriptions) = record_connection_topics(runtime.broker());

    // WHEN: The backend pushes connecting, connected
    runtime.dispatch(PushEvent::ClientConnecting);
    runtime.dispatch(PushEvent::ClientConnected);

    // THEN: Connected, and exactly two publishes in order
    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Connected
    );
    assert_eq!(*seen.lock().unwrap(), vec!["connecting", "connected"]);
}

/// **VALUE**: Verifies illegal and duplicate signals leave the state alone and publish
/// nothing.
///
/// **WHY THIS MATTERS**: A stale `connected` arriving after a disconnect must not
/// resurrect the indicator.
///
/// **BUG THIS CATCHES**: Would catch the store publishing ignored transitions.
#[test]
fn given_disconnected_when_connected_arrives_then_ignored() {
    let bridge = MockBridge::with_listeners(&[]);
    let runtime = runtime(&bridge);
    let (seen, _subscriptions) = record_connection_topics(runtime.broker());

    runtime.dispatch(PushEvent::ClientConnected);
    runtime.dispatch(PushEvent::ClientDisconnected);

    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Disconnected
    );
    assert!(seen.lock().unwrap().is_empty());
}

/// **VALUE**: Verifies a seed answer of `true` goes through `Connecting` and never
/// jumps straight to `Connected`.
///
/// **WHY THIS MATTERS**: Subscribers rely on seeing the full transition sequence.
///
/// **BUG THIS CATCHES**: Would catch the seed assigning the state directly.
#[tokio::test]
async fn given_backend_connected_when_seeded_then_transitions_through_connecting() {
    // GIVEN: Backend already connected
    let bridge = MockBridge::with_listeners(&[]);
    bridge.set_connected(true);
    let runtime = runtime(&bridge);
    let (seen, _subscriptions) = record_connection_topics(runtime.broker());

    // WHEN: Seeding
    runtime.connection().seed(bridge.as_ref()).await.unwrap();

    // THEN: Connected via Connecting
    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Connected
    );
    assert_eq!(*seen.lock().unwrap(), vec!["connecting", "connected"]);
}

/// **VALUE**: Verifies a push-event that arrived before the seed answer is applied
/// first, and the seed then reduces on top of it.
///
/// **WHY THIS MATTERS**: Routing is installed before seeding, so the two can
/// interleave. Arrival order must win.
///
/// **BUG THIS CATCHES**: Would catch the seed overwriting earlier push-events, or a
/// duplicate `connecting` publish.
#[tokio::test]
async fn given_earlier_push_event_when_seed_arrives_then_applied_in_arrival_order() {
    let bridge = MockBridge::with_listeners(&[]);
    bridge.set_connected(true);
    let runtime = runtime(&bridge);
    let (seen, _subscriptions) = record_connection_topics(runtime.broker());

    // GIVEN: connecting already pushed
    runtime.dispatch(PushEvent::ClientConnecting);

    // WHEN: The seed answers `true`
    runtime.connection().seed(bridge.as_ref()).await.unwrap();

    // THEN: Its duplicate connecting is ignored, connected applies
    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Connected
    );
    assert_eq!(*seen.lock().unwrap(), vec!["connecting", "connected"]);
}

// ----------------------------------------------------------------------------
// Aggregate Forwarders State Store
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the aggregate events drive `{starting, started}` and each change
/// is published once.
///
/// **WHY THIS MATTERS**: The "start all" control is rendered from this pair.
///
/// **BUG THIS CATCHES**: Would catch per-listener events leaking into the aggregate,
/// or duplicates being re-published.
#[test]
fn given_aggregate_events_when_dispatched_then_state_and_publishes_follow() {
    // GIVEN: Counters on the three aggregate topics
    let bridge = MockBridge::with_listeners(&[]);
    let runtime = runtime(&bridge);
    let publishes = Arc::new(AtomicUsize::new(0));
    let _subscriptions = [
        {
            let p = Arc::clone(&publishes);
            runtime.broker().subscribe::<ForwardersStarting, _>(move |_| {
                p.fetch_add(1, Ordering::SeqCst);
            })
        },
        {
            let p = Arc::clone(&publishes);
            runtime.broker().subscribe::<ForwardersStarted, _>(move |_| {
                p.fetch_add(1, Ordering::SeqCst);
            })
        },
        {
            let p = Arc::clone(&publishes);
            runtime.broker().subscribe::<ForwardersStopped, _>(move |_| {
                p.fetch_add(1, Ordering::SeqCst);
            })
        },
    ];

    // WHEN: starting
    runtime.dispatch(PushEvent::ForwardersStarting);
    assert_eq!(
        runtime.forwarders().state(),
        AggregateForwardersState {
            starting: true,
            started: false
        }
    );

    // AND: a per-listener event (must not touch the aggregate)
    runtime.dispatch(PushEvent::ForwarderStarted(ListenerKey::from("a")));

    // AND: started, twice
    runtime.dispatch(PushEvent::ForwardersStarted);
    runtime.dispatch(PushEvent::ForwardersStarted);
    assert_eq!(
        runtime.forwarders().state(),
        AggregateForwardersState {
            starting: false,
            started: true
        }
    );

    // AND: stopped
    runtime.dispatch(PushEvent::ForwardersStopped);

    // THEN: Three changes, three publishes
    assert_eq!(
        runtime.forwarders().state(),
        AggregateForwardersState::default()
    );
    assert_eq!(publishes.load(Ordering::SeqCst), 3);
}

/// **VALUE**: Verifies `reload_status` answering `false` does not cancel a start in
/// progress, while `true` completes it.
///
/// **WHY THIS MATTERS**: The backend reports `false` until the last forwarder is up;
/// treating that as "stopped" would hide the spinner mid-start.
///
/// **BUG THIS CATCHES**: Would catch `false` being reduced as stopped unconditionally.
#[tokio::test]
async fn given_start_in_progress_when_reload_answers_false_then_still_starting() {
    let bridge = MockBridge::with_listeners(&[]);
    let runtime = runtime(&bridge);

    // GIVEN: A start in progress
    runtime.dispatch(PushEvent::ForwardersStarting);

    // WHEN: Reload answers false
    runtime.reload_forwarders_status().await;

    // THEN: Still starting
    assert!(runtime.forwarders().state().starting);

    // WHEN: Reload answers true
    bridge.set_all_started(true);
    runtime.reload_forwarders_status().await;

    // THEN: Started
    assert_eq!(
        runtime.forwarders().state(),
        AggregateForwardersState {
            starting: false,
            started: true
        }
    );
}

// ----------------------------------------------------------------------------
// Runtime
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies `start` seeds every store and then signals ready once.
///
/// **WHY THIS MATTERS**: The backend holds back pushes until `ready`; a client that
/// never sends it shows stale state forever.
///
/// **BUG THIS CATCHES**: Would catch `ready` sent before seeding, or not at all.
#[tokio::test]
async fn given_backend_state_when_started_then_seeds_then_signals_ready() {
    // GIVEN: A connected backend with all forwarders up
    let bridge = MockBridge::with_listeners(&[]);
    bridge.set_connected(true);
    bridge.set_all_started(true);
    bridge.set_environment(EnvironmentInfo {
        build_type: "release".to_string(),
        platform: "linux".to_string(),
        arch: "x86_64".to_string(),
    });
    let runtime = runtime(&bridge);

    // WHEN: Starting
    runtime.start().await.unwrap();

    // THEN: Seeds ran in order, stores reflect them, ready was sent once
    assert_eq!(
        bridge.commands(),
        vec![
            IpcCommand::GetEnvironment,
            IpcCommand::ConnectedStatus,
            IpcCommand::AllForwardersStarted
        ]
    );
    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Connected
    );
    assert!(runtime.forwarders().state().started);
    assert_eq!(runtime.environment().unwrap().platform, "linux");
    assert_eq!(bridge.ready_signals(), 1);
}

/// **VALUE**: Verifies failing seeds keep defaults and `ready` is still sent.
///
/// **WHY THIS MATTERS**: A backend that cannot answer one query must still receive
/// `ready` so its pushes can repair the state.
///
/// **BUG THIS CATCHES**: Would catch `?` on a seed aborting the startup sequence.
#[tokio::test]
async fn given_failing_seeds_when_started_then_defaults_and_ready_sent() {
    let bridge = MockBridge::with_listeners(&[]);
    bridge.fail("GetEnvironment", "boom");
    bridge.fail("ConnectedStatus", "boom");
    bridge.fail("AllForwardersStarted", "boom");
    let runtime = runtime(&bridge);

    runtime.start().await.unwrap();

    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Disconnected
    );
    assert_eq!(
        runtime.forwarders().state(),
        AggregateForwardersState::default()
    );
    assert!(runtime.environment().is_none());
    assert_eq!(bridge.ready_signals(), 1);
}

/// **VALUE**: Verifies `pump` routes every queued push-event and returns when the
/// stream closes.
///
/// **WHY THIS MATTERS**: This is the only path from the transport into the stores.
///
/// **BUG THIS CATCHES**: Would catch the pump exiting early or dropping events.
#[tokio::test]
async fn given_event_stream_when_pumped_then_all_events_reach_stores() {
    // GIVEN: A stream with four queued events, then closed
    let bridge = MockBridge::with_listeners(&[]);
    let runtime = runtime(&bridge);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tx.send(PushEvent::ClientConnecting).unwrap();
    tx.send(PushEvent::ClientConnected).unwrap();
    tx.send(PushEvent::ForwardersStarting).unwrap();
    tx.send(PushEvent::ForwarderStarted(ListenerKey::from("127.0.0.1:8080")))
        .unwrap();
    drop(tx);

    let started_keys = Arc::new(Mutex::new(Vec::new()));
    let _subscription = {
        let started_keys = Arc::clone(&started_keys);
        runtime
            .broker()
            .subscribe::<ForwarderStarted, _>(move |key| {
                started_keys.lock().unwrap().push(key.clone())
            })
    };

    // WHEN: Pumping to completion
    runtime.clone().pump(rx).await;

    // THEN: Stores updated, per-listener event republished on the broker
    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Connected
    );
    assert!(runtime.forwarders().state().starting);
    assert_eq!(
        *started_keys.lock().unwrap(),
        vec![ListenerKey::from("127.0.0.1:8080")]
    );
}

/// **VALUE**: Verifies request operations only issue commands and report failures in
/// the alert store.
///
/// **WHY THIS MATTERS**: Connect/disconnect must never set the state themselves; the
/// push-events do. Failures must be visible to the user.
///
/// **BUG THIS CATCHES**: Would catch `connect` optimistically setting `Connecting`.
#[tokio::test]
async fn given_connect_request_when_backend_fails_then_alert_and_state_untouched() {
    let bridge = MockBridge::with_listeners(&[]);
    let runtime = runtime(&bridge);

    // WHEN: Connect succeeds
    runtime.connect().await.unwrap();

    // THEN: Only the command was sent
    assert_eq!(bridge.commands(), vec![IpcCommand::StartClient]);
    assert_eq!(
        runtime.connection().connection_state(),
        ConnectionState::Disconnected
    );
    assert!(runtime.alerts().current().is_none());

    // WHEN: Stop-all fails
    bridge.fail("StopAllForwarders", "no forwarders configured");
    assert!(runtime.stop_all_forwarders().await.is_err());

    // THEN: Error alert carries the backend's reason
    let alert = runtime.alerts().current().unwrap();
    assert_eq!(alert.level, AlertLevel::Error);
    assert_eq!(
        alert.message,
        "Failed to stop forwarders: no forwarders configured"
    );
}
