use crate::helpers::MockBridge;

use client_core::broker::EventBroker;
use client_core::error::lifecycle::LifecycleError;
use client_core::forwarder::{
    ForwarderController, ForwarderResolver, ForwarderRuntimeState, LifecycleAction,
    LifecycleOutcome,
};
use client_core::ipc::{IpcCommand, PushEvent};
use client_core::store::{AlertLevel, AlertStore, Runtime};

use common::ListenerKey;

use std::sync::Arc;
use std::time::Duration;

const KEY: &str = "127.0.0.1:8080";

struct Fixture {
    bridge: Arc<MockBridge>,
    runtime: Runtime<MockBridge>,
}

impl Fixture {
    fn new(listeners: &[&str]) -> Self {
        let bridge = MockBridge::with_listeners(listeners);
        let runtime = Runtime::new(Arc::clone(&bridge), EventBroker::new(), AlertStore::new());
        Self { bridge, runtime }
    }

    fn controller(&self, key: &str) -> ForwarderController<MockBridge> {
        ForwarderController::new(
            ListenerKey::from(key),
            Arc::clone(&self.bridge),
            self.runtime.broker().clone(),
            self.runtime.alerts().clone(),
        )
    }

    fn push_started(&self, key: &str) {
        self.runtime
            .dispatch(PushEvent::ForwarderStarted(ListenerKey::from(key)));
    }

    fn push_stopped(&self, key: &str) {
        self.runtime
            .dispatch(PushEvent::ForwarderStopped(ListenerKey::from(key)));
    }
}

// ----------------------------------------------------------------------------
// ForwarderResolver
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the resolver returns the first matching position and reports
/// missing keys and query failures as distinct errors.
///
/// **WHY THIS MATTERS**: The index is what the backend acts on; a wrong index starts
/// someone else's forwarder.
///
/// **BUG THIS CATCHES**: Would catch a query failure being reported as "does not exist".
#[tokio::test]
async fn given_config_when_resolving_then_index_or_typed_error() {
    // GIVEN: Three listeners, the key present twice
    let bridge = MockBridge::with_listeners(&["127.0.0.1:1", KEY, KEY]);
    let resolver = ForwarderResolver::new(Arc::clone(&bridge));

    // THEN: First match wins
    assert_eq!(resolver.resolve_index(&ListenerKey::from(KEY)).await.unwrap(), 1);

    // THEN: Missing key is NotFound
    assert!(matches!(
        resolver.resolve_index(&ListenerKey::from("127.0.0.1:2")).await,
        Err(LifecycleError::NotFound { .. })
    ));

    // THEN: Config failure is Query
    bridge.fail("GetConfig", "backend unreachable");
    assert!(matches!(
        resolver.resolve_index(&ListenerKey::from(KEY)).await,
        Err(LifecycleError::Query { .. })
    ));

    // AND: Every call went to the backend (no caching)
    assert_eq!(bridge.commands().len(), 3);
}

// ----------------------------------------------------------------------------
// ForwarderController
// ----------------------------------------------------------------------------

/// **VALUE**: Verifies the start path: command sent with the resolved index, state
/// flips only on the backend's event.
///
/// **WHY THIS MATTERS**: The backend is the source of truth. Showing `Started` because
/// the command returned would lie when the bind later fails.
///
/// **BUG THIS CATCHES**: Would catch the controller setting `Started` from the command
/// result.
#[tokio::test]
async fn given_stopped_forwarder_when_toggled_and_event_arrives_then_started() {
    // GIVEN: A stopped forwarder at index 0
    let fixture = Fixture::new(&[KEY]);
    let controller = fixture.controller(KEY);

    // WHEN: Toggling
    let outcome = controller.toggle().await.unwrap();

    // THEN: Start was issued, state still waits for the backend
    assert_eq!(outcome, LifecycleOutcome::Issued(LifecycleAction::Start));
    assert_eq!(
        fixture.bridge.commands(),
        vec![IpcCommand::GetConfig, IpcCommand::StartForwarder(0)]
    );
    assert_eq!(controller.snapshot().state, ForwarderRuntimeState::Stopped);
    assert!(!controller.snapshot().loading);

    // WHEN: The backend confirms
    fixture.push_started(KEY);

    // THEN: Started
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, ForwarderRuntimeState::Started);
    assert!(!snapshot.loading);
}

/// **VALUE**: Verifies `toggle` while an action is in flight does nothing, and that the
/// in-flight start is displayed as `Starting`.
///
/// **WHY THIS MATTERS**: Double clicks must not send two start commands.
///
/// **BUG THIS CATCHES**: Would catch the re-entrancy guard being checked after the
/// first await instead of before.
#[tokio::test]
async fn given_action_in_flight_when_toggled_again_then_no_duplicate_command() {
    // GIVEN: Start commands held open by the backend
    let fixture = Fixture::new(&[KEY]);
    let gate = fixture.bridge.hold_commands();
    let controller = fixture.controller(KEY);

    // WHEN: A second toggle happens while the first is in flight
    let first = controller.toggle();
    let second = async {
        while !controller.snapshot().loading
            || controller.snapshot().state != ForwarderRuntimeState::Starting
        {
            tokio::task::yield_now().await;
        }
        let outcome = controller.toggle().await;
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    // THEN: Second was rejected, exactly one start was sent
    assert_eq!(
        first.unwrap(),
        LifecycleOutcome::Issued(LifecycleAction::Start)
    );
    assert_eq!(second.unwrap(), LifecycleOutcome::Busy);
    assert_eq!(
        fixture.bridge.lifecycle_commands(),
        vec![IpcCommand::StartForwarder(0)]
    );
    assert!(!controller.snapshot().loading);
}

/// **VALUE**: Verifies an event for another key never changes this controller.
///
/// **WHY THIS MATTERS**: All controllers share one broker; filtering by key is the
/// only isolation.
///
/// **BUG THIS CATCHES**: Would catch a handler that ignores the payload.
#[tokio::test]
async fn given_two_controllers_when_event_for_other_key_then_unchanged() {
    let fixture = Fixture::new(&[KEY, "127.0.0.1:9090"]);
    let a = fixture.controller(KEY);
    let b = fixture.controller("127.0.0.1:9090");

    fixture.push_started("127.0.0.1:9090");

    assert_eq!(a.snapshot().state, ForwarderRuntimeState::Stopped);
    assert_eq!(b.snapshot().state, ForwarderRuntimeState::Started);

    fixture.push_started(KEY);
    fixture.push_stopped("127.0.0.1:9090");

    assert_eq!(a.snapshot().state, ForwarderRuntimeState::Started);
    assert_eq!(b.snapshot().state, ForwarderRuntimeState::Stopped);
}

/// **VALUE**: Verifies a key missing from the backend config alerts and sends nothing.
///
/// **WHY THIS MATTERS**: The config can change under the UI; acting on a stale index
/// would hit another forwarder.
///
/// **BUG THIS CATCHES**: Would catch `loading` staying set after the failure.
#[tokio::test]
async fn given_unknown_key_when_toggled_then_alert_and_no_command() {
    // GIVEN: A controller for a key the backend does not know
    let fixture = Fixture::new(&["127.0.0.1:1"]);
    let controller = fixture.controller(KEY);

    // WHEN: Toggling
    let result = controller.toggle().await;

    // THEN: NotFound, alert shown, no start/stop, state untouched
    assert!(matches!(result, Err(LifecycleError::NotFound { .. })));
    let alert = fixture.runtime.alerts().current().unwrap();
    assert_eq!(alert.level, AlertLevel::Error);
    assert_eq!(alert.message, format!("Forwarder {KEY} does not exist"));
    assert!(fixture.bridge.lifecycle_commands().is_empty());

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, ForwarderRuntimeState::Stopped);
    assert!(!snapshot.loading);
}

/// **VALUE**: Verifies a failed config query also clears `loading` and alerts.
///
/// **WHY THIS MATTERS**: The control must never stay disabled after an error.
///
/// **BUG THIS CATCHES**: Would catch the query error bypassing the cleanup.
#[tokio::test]
async fn given_config_query_failure_when_toggled_then_alert_and_not_loading() {
    let fixture = Fixture::new(&[KEY]);
    fixture.bridge.fail("GetConfig", "backend unreachable");
    let controller = fixture.controller(KEY);

    let result = controller.toggle().await;

    assert!(matches!(result, Err(LifecycleError::Query { .. })));
    assert!(fixture.runtime.alerts().current().is_some());
    assert!(fixture.bridge.lifecycle_commands().is_empty());
    assert!(!controller.snapshot().loading);
}

/// **VALUE**: Verifies a failed command alerts with action and cause and leaves the
/// state alone.
///
/// **WHY THIS MATTERS**: Users need to know which action failed and why.
///
/// **BUG THIS CATCHES**: Would catch a generic message without the backend's reason.
#[tokio::test]
async fn given_command_failure_when_toggled_then_alert_names_action_and_cause() {
    let fixture = Fixture::new(&[KEY]);
    fixture.bridge.fail("StartForwarder", "address already in use");
    let controller = fixture.controller(KEY);

    let result = controller.toggle().await;

    assert!(matches!(
        result,
        Err(LifecycleError::Command {
            action: LifecycleAction::Start,
            ..
        })
    ));
    assert_eq!(
        fixture.runtime.alerts().current().unwrap().message,
        format!("Failed to start forwarder {KEY}: address already in use")
    );
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, ForwarderRuntimeState::Stopped);
    assert!(!snapshot.loading);
}

/// **VALUE**: Verifies stopping a running forwarder waits for confirmation, and
/// `cancel` returns to a non-loading `Started`.
///
/// **WHY THIS MATTERS**: Stopping drops live connections; it must be deliberate.
///
/// **BUG THIS CATCHES**: Would catch `StopForwarder` being issued from `toggle`.
#[tokio::test]
async fn given_started_forwarder_when_toggled_then_cancelled_then_still_started() {
    // GIVEN: A running forwarder
    let fixture = Fixture::new(&[KEY]);
    let controller = fixture.controller(KEY);
    fixture.push_started(KEY);

    // WHEN: Toggling
    let outcome = controller.toggle().await.unwrap();

    // THEN: Confirmation pending, no command, re-entry blocked
    assert_eq!(outcome, LifecycleOutcome::AwaitingConfirmation);
    assert!(fixture.bridge.commands().is_empty());
    let snapshot = controller.snapshot();
    assert!(snapshot.loading);
    assert!(snapshot.confirm_pending);
    assert_eq!(controller.toggle().await.unwrap(), LifecycleOutcome::Busy);

    // WHEN: Cancelling
    assert!(controller.cancel());

    // THEN: Still started, nothing sent, control usable again
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, ForwarderRuntimeState::Started);
    assert!(!snapshot.loading);
    assert!(!snapshot.confirm_pending);
    assert!(fixture.bridge.commands().is_empty());
    assert!(!controller.cancel());
}

/// **VALUE**: Verifies the confirmed stop path end to end: `StopForwarder(2)`, then the
/// backend's event stops it.
///
/// **WHY THIS MATTERS**: This is the user-visible stop flow for the third configured
/// listener.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one index or the state flipping to
/// `Stopped` before the backend says so.
#[tokio::test]
async fn given_confirmed_stop_when_event_arrives_then_stopped() {
    // GIVEN: The key at index 2, running
    let fixture = Fixture::new(&["127.0.0.1:1", "127.0.0.1:2", KEY]);
    let controller = fixture.controller(KEY);
    fixture.push_started(KEY);

    // WHEN: Toggle, confirm
    controller.toggle().await.unwrap();
    let outcome = controller.confirm().await.unwrap();

    // THEN: Stop issued with index 2, state still Started
    assert_eq!(outcome, LifecycleOutcome::Issued(LifecycleAction::Stop));
    assert_eq!(
        fixture.bridge.lifecycle_commands(),
        vec![IpcCommand::StopForwarder(2)]
    );
    assert_eq!(controller.snapshot().state, ForwarderRuntimeState::Started);

    // WHEN: The backend reports the stop
    fixture.push_stopped(KEY);

    // THEN: Stopped, idle
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, ForwarderRuntimeState::Stopped);
    assert!(!snapshot.loading);
    assert!(!snapshot.confirm_pending);
}

/// **VALUE**: Verifies a stop pushed by the backend while confirmation is pending
/// clears the confirmation.
///
/// **WHY THIS MATTERS**: Another client may stop the forwarder first; there is then
/// nothing left to confirm.
///
/// **BUG THIS CATCHES**: Would catch a stale confirmation issuing a stop for a
/// stopped forwarder.
#[tokio::test]
async fn given_pending_confirmation_when_stopped_elsewhere_then_confirmation_cleared() {
    let fixture = Fixture::new(&[KEY]);
    let controller = fixture.controller(KEY);
    fixture.push_started(KEY);
    controller.toggle().await.unwrap();

    fixture.push_stopped(KEY);

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.state, ForwarderRuntimeState::Stopped);
    assert!(!snapshot.loading);
    assert!(!snapshot.confirm_pending);
    assert_eq!(
        controller.confirm().await.unwrap(),
        LifecycleOutcome::NothingPending
    );
    assert!(fixture.bridge.commands().is_empty());
}

/// **VALUE**: Verifies dropping an in-flight toggle clears `loading`.
///
/// **WHY THIS MATTERS**: A view closed mid-action must not leave a shared controller
/// permanently busy.
///
/// **BUG THIS CATCHES**: Would catch `loading` cleared only after the await returns.
#[tokio::test]
async fn given_in_flight_toggle_when_future_dropped_then_not_loading() {
    // GIVEN: A start held open forever
    let fixture = Fixture::new(&[KEY]);
    let _gate = fixture.bridge.hold_commands();
    let controller = fixture.controller(KEY);

    // WHEN: The toggle future is abandoned
    let result = tokio::time::timeout(Duration::from_millis(50), controller.toggle()).await;

    // THEN: It timed out and the controller is idle again
    assert!(result.is_err());
    let snapshot = controller.snapshot();
    assert!(!snapshot.loading);
    assert_eq!(snapshot.state, ForwarderRuntimeState::Stopped);
}

/// **VALUE**: Verifies `hydrate` asks the backend and every controller for the key
/// converges, and that dropping a controller releases its subscriptions.
///
/// **WHY THIS MATTERS**: A view opened after the forwarder started has missed the
/// event; hydration is how it catches up.
///
/// **BUG THIS CATCHES**: Would catch hydration updating only the asking controller.
#[tokio::test]
async fn given_running_forwarder_when_hydrated_then_all_controllers_converge() {
    use client_core::broker::topics::ForwarderStarted;

    // GIVEN: Backend reports the forwarder as running, two controllers for it
    let fixture = Fixture::new(&[KEY]);
    fixture.bridge.set_forwarder_started(KEY);
    let a = fixture.controller(KEY);
    let b = fixture.controller(KEY);

    // WHEN: One hydrates
    a.hydrate().await.unwrap();

    // THEN: Both show Started
    assert_eq!(a.snapshot().state, ForwarderRuntimeState::Started);
    assert_eq!(b.snapshot().state, ForwarderRuntimeState::Started);
    assert_eq!(
        fixture.bridge.commands(),
        vec![IpcCommand::ForwarderStarted(ListenerKey::from(KEY))]
    );

    // AND: Dropping the controllers releases their handlers
    assert_eq!(fixture.runtime.broker().subscriber_count::<ForwarderStarted>(), 2);
    drop((a, b));
    assert_eq!(fixture.runtime.broker().subscriber_count::<ForwarderStarted>(), 0);
}
