use crate::helpers::StubBridge;

use phantom::console::ConsoleCommand;
use phantom::error::PhantomError;
use phantom::panel::ControlPanel;

use client_core::broker::EventBroker;
use client_core::forwarder::ForwarderRuntimeState;
use client_core::ipc::{IpcCommand, PushEvent};
use client_core::store::{AlertStore, Runtime};

use common::ListenerKey;

use std::sync::Arc;

const WEB: &str = "127.0.0.1:8080";
const DB: &str = "127.0.0.1:5432";
const CACHE: &str = "127.0.0.1:6379";

fn panel(bridge: &Arc<StubBridge>) -> ControlPanel<StubBridge> {
    ControlPanel::new(Runtime::new(
        Arc::clone(bridge),
        EventBroker::new(),
        AlertStore::new(),
    ))
}

fn state_of(panel: &ControlPanel<StubBridge>, key: &str) -> ForwarderRuntimeState {
    panel
        .snapshot()
        .listeners
        .into_iter()
        .find(|listener| listener.listen == key)
        .map(|listener| listener.snapshot.state)
        .expect("listener not in snapshot")
}

/// **VALUE**: Verifies `refresh_listeners` creates a hydrated controller per listener.
///
/// **WHY THIS MATTERS**: A client started after the backend must show forwarders that
/// are already running.
///
/// **BUG THIS CATCHES**: Would catch controllers created without hydration (all shown
/// as stopped).
#[tokio::test]
async fn given_backend_listeners_when_refreshed_then_controllers_hydrated() {
    // GIVEN: Two listeners, one already running
    let bridge = StubBridge::new(&[WEB, DB]);
    bridge.set_started(DB);
    let panel = panel(&bridge);

    // WHEN: Refreshing
    let count = panel.refresh_listeners().await.unwrap();

    // THEN: Both present, DB started
    assert_eq!(count, 2);
    assert_eq!(state_of(&panel, WEB), ForwarderRuntimeState::Stopped);
    assert_eq!(state_of(&panel, DB), ForwarderRuntimeState::Started);
}

/// **VALUE**: Verifies a refresh keeps existing controllers (and their pending
/// confirmation) and drops removed listeners.
///
/// **WHY THIS MATTERS**: `reload` in the middle of a stop confirmation must not lose it.
///
/// **BUG THIS CATCHES**: Would catch refresh rebuilding every controller from scratch.
#[tokio::test]
async fn given_pending_confirmation_when_refreshed_then_kept() {
    // GIVEN: WEB running with a stop awaiting confirmation
    let bridge = StubBridge::new(&[WEB, DB]);
    bridge.set_started(WEB);
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();
    panel
        .execute(ConsoleCommand::Toggle(ListenerKey::from(WEB)))
        .await
        .unwrap();

    // WHEN: DB disappears from the config and the panel reloads
    bridge.set_listeners(&[WEB]);
    panel.refresh_listeners().await.unwrap();

    // THEN: WEB still awaits confirmation, DB is gone
    let snapshot = panel.snapshot();
    assert_eq!(snapshot.listeners.len(), 1);
    assert!(snapshot.listeners[0].snapshot.confirm_pending);
    assert_eq!(panel.listeners(), vec![ListenerKey::from(WEB)]);
}

/// **VALUE**: Verifies the console toggle/confirm flow reaches the backend with the
/// right index and the state follows the pushed event.
///
/// **WHY THIS MATTERS**: This is the end-to-end operator flow.
///
/// **BUG THIS CATCHES**: Would catch commands routed to the wrong controller.
#[tokio::test]
async fn given_running_forwarder_when_toggled_and_confirmed_then_stop_issued() {
    let bridge = StubBridge::new(&[DB, WEB]);
    bridge.set_started(WEB);
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();

    // WHEN: toggle + confirm WEB
    let asked = panel
        .execute(ConsoleCommand::Toggle(ListenerKey::from(WEB)))
        .await
        .unwrap()
        .unwrap();
    let done = panel
        .execute(ConsoleCommand::Confirm(ListenerKey::from(WEB)))
        .await
        .unwrap()
        .unwrap();

    // THEN: Stop sent for index 1, texts describe each step
    assert!(asked.contains("confirm"));
    assert_eq!(done, format!("{WEB}: stop requested"));
    assert!(bridge.commands().contains(&IpcCommand::StopForwarder(1)));

    // WHEN: Backend confirms
    panel
        .runtime()
        .dispatch(PushEvent::ForwarderStopped(ListenerKey::from(WEB)));

    // THEN: Stopped
    assert_eq!(state_of(&panel, WEB), ForwarderRuntimeState::Stopped);
}

/// **VALUE**: Verifies commands for unknown listeners and failing commands return
/// errors without disturbing other state.
///
/// **WHY THIS MATTERS**: Typos in the console must be reported, not silently ignored.
///
/// **BUG THIS CATCHES**: Would catch a lookup miss creating an ad-hoc controller.
#[tokio::test]
async fn given_bad_targets_when_executed_then_errors_returned() {
    let bridge = StubBridge::new(&[WEB]);
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();

    // Unknown listener
    let unknown = panel
        .execute(ConsoleCommand::Toggle(ListenerKey::from("127.0.0.1:1")))
        .await;
    assert!(matches!(unknown, Err(PhantomError::Console { .. })));

    // Backend rejects the start
    bridge.fail_commands("address already in use");
    let failed = panel
        .execute(ConsoleCommand::Toggle(ListenerKey::from(WEB)))
        .await;
    match failed {
        Err(PhantomError::Core { message, .. }) => {
            assert_eq!(
                message,
                format!("Failed to start forwarder {WEB}: address already in use")
            );
        }
        other => panic!("Expected Core error, got {other:?}"),
    }
    assert!(panel.snapshot().alert.is_some());
    assert!(!panel.snapshot().listeners[0].snapshot.loading);
}

/// **VALUE**: Verifies `status` renders the whole snapshot as JSON.
///
/// **WHY THIS MATTERS**: Scripts drive the console and parse this output.
///
/// **BUG THIS CATCHES**: Would catch the flattened snapshot fields going missing.
#[tokio::test]
async fn given_panel_when_status_requested_then_json_snapshot() {
    let bridge = StubBridge::new(&[WEB]);
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();
    panel.runtime().dispatch(PushEvent::ClientConnecting);

    let output = panel
        .execute(ConsoleCommand::Status)
        .await
        .unwrap()
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(json["connection"], "Connecting");
    assert_eq!(json["forwarders"]["started"], false);
    assert_eq!(json["listeners"][0]["listen"], WEB);
    assert_eq!(json["listeners"][0]["state"], "Stopped");
    assert_eq!(json["listeners"][0]["loading"], false);
}

/// **VALUE**: Verifies runtime-level commands issue exactly their IPC command.
///
/// **WHY THIS MATTERS**: connect/start-all only request; the state must follow
/// push-events.
///
/// **BUG THIS CATCHES**: Would catch a console verb wired to the wrong runtime call.
#[tokio::test]
async fn given_runtime_commands_when_executed_then_matching_ipc_sent() {
    let bridge = StubBridge::new(&[]);
    let panel = panel(&bridge);

    for command in [
        ConsoleCommand::Connect,
        ConsoleCommand::Disconnect,
        ConsoleCommand::StartAll,
        ConsoleCommand::StopAll,
    ] {
        assert_eq!(panel.execute(command).await.unwrap(), None);
    }

    assert_eq!(
        bridge.commands(),
        vec![
            IpcCommand::StartClient,
            IpcCommand::StopClient,
            IpcCommand::StartAllForwarders,
            IpcCommand::StopAllForwarders
        ]
    );
}

/// **VALUE**: Verifies `remove` deletes the listener at its current index and the panel
/// drops its controller.
///
/// **WHY THIS MATTERS**: After a removal every later listener moves up one index; a
/// controller left behind would keep offering a listener that no longer exists.
///
/// **BUG THIS CATCHES**: Would catch a remove sent with an index from an older config,
/// or the panel not refreshing after the removal.
#[tokio::test]
async fn given_listeners_when_removed_then_fresh_index_and_controller_dropped() {
    // GIVEN: DB at 0, WEB at 1, CACHE at 2
    let bridge = StubBridge::new(&[DB, WEB, CACHE]);
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();

    // WHEN: Removing DB, then CACHE
    panel
        .execute(ConsoleCommand::Remove(ListenerKey::from(DB)))
        .await
        .unwrap();
    let output = panel
        .execute(ConsoleCommand::Remove(ListenerKey::from(CACHE)))
        .await
        .unwrap();

    // THEN: CACHE was removed at its shifted index 1, only WEB is left
    assert_eq!(output, Some(format!("{CACHE}: removed")));
    let removals: Vec<_> = bridge
        .commands()
        .into_iter()
        .filter(|command| matches!(command, IpcCommand::RemoveForwarder(_)))
        .collect();
    assert_eq!(
        removals,
        vec![IpcCommand::RemoveForwarder(0), IpcCommand::RemoveForwarder(1)]
    );
    assert_eq!(panel.listeners(), vec![ListenerKey::from(WEB)]);

    // AND: Toggling WEB now starts index 0
    panel
        .execute(ConsoleCommand::Toggle(ListenerKey::from(WEB)))
        .await
        .unwrap();
    assert!(bridge.commands().contains(&IpcCommand::StartForwarder(0)));
}

/// **VALUE**: Verifies `add` sends the listener and gives it a hydrated controller.
///
/// **WHY THIS MATTERS**: The backend starts a forwarder as soon as it is added; the
/// panel must show it running without a manual `reload`.
///
/// **BUG THIS CATCHES**: Would catch the new listener missing from `status` or shown as
/// stopped because its controller was never hydrated.
#[tokio::test]
async fn given_new_listener_when_added_then_controller_created_and_hydrated() {
    let bridge = StubBridge::new(&[WEB]);
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();
    bridge.set_started(DB);

    let output = panel
        .execute(ConsoleCommand::Add {
            listen: ListenerKey::from(DB),
            hostname: String::from("db.example.com"),
            label: String::from("postgres"),
        })
        .await
        .unwrap();

    assert_eq!(output, Some(format!("{DB}: added")));
    let added = bridge
        .commands()
        .into_iter()
        .find_map(|command| match command {
            IpcCommand::AddForwarder(listener) => Some(listener),
            _ => None,
        })
        .unwrap();
    assert_eq!(added.hostname, "db.example.com");
    assert_eq!(added.label, "postgres");
    assert!(
        bridge
            .commands()
            .contains(&IpcCommand::ForwarderStarted(ListenerKey::from(DB)))
    );
    assert_eq!(state_of(&panel, DB), ForwarderRuntimeState::Started);
    assert_eq!(state_of(&panel, WEB), ForwarderRuntimeState::Stopped);
}

/// **VALUE**: Verifies `label` and `nodes` go through the registry and render the
/// backend's answer.
///
/// **WHY THIS MATTERS**: `nodes` is how an operator sees which gateway a tunnel uses.
///
/// **BUG THIS CATCHES**: Would catch the relabel hitting the wrong index or the node
/// list rendered without labels.
#[tokio::test]
async fn given_running_listener_when_relabelled_then_nodes_show_new_label() {
    let bridge = StubBridge::new(&[WEB, DB]);
    bridge.set_started(DB);
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();

    panel
        .execute(ConsoleCommand::Label {
            listen: ListenerKey::from(DB),
            label: String::from("primary db"),
        })
        .await
        .unwrap();
    let nodes = panel.execute(ConsoleCommand::Nodes).await.unwrap();

    assert!(
        bridge
            .commands()
            .contains(&IpcCommand::UpdateForwarderLabel(1, String::from("primary db")))
    );
    assert_eq!(nodes, Some(String::from("primary db via gw-1.example:443")));
}

/// **VALUE**: Verifies a command running on one panel clone makes a second toggle from
/// another clone report busy.
///
/// **WHY THIS MATTERS**: The console runs each command on its own task, so a second
/// `toggle` can arrive while the first waits on the backend.
///
/// **BUG THIS CATCHES**: Would catch clones holding separate controllers, which would
/// send a duplicate start for the same listener.
#[tokio::test]
async fn given_toggle_in_flight_when_toggled_from_clone_then_busy() {
    // GIVEN: Start commands held open by the backend
    let bridge = StubBridge::new(&[WEB]);
    let gate = bridge.hold_commands();
    let panel = panel(&bridge);
    panel.refresh_listeners().await.unwrap();

    let first = {
        let panel = panel.clone();
        tokio::spawn(async move {
            panel
                .execute(ConsoleCommand::Toggle(ListenerKey::from(WEB)))
                .await
        })
    };
    while !panel.snapshot().listeners[0].snapshot.loading {
        tokio::task::yield_now().await;
    }

    // WHEN: Toggling again while the start is in flight
    let second = panel
        .execute(ConsoleCommand::Toggle(ListenerKey::from(WEB)))
        .await
        .unwrap();

    // THEN: Busy, and only one start reached the backend
    assert_eq!(
        second,
        Some(format!("{WEB}: busy, try again when the action completes"))
    );

    gate.notify_one();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first, Some(format!("{WEB}: start requested")));
    let starts = bridge
        .commands()
        .into_iter()
        .filter(|command| matches!(command, IpcCommand::StartForwarder(_)))
        .count();
    assert_eq!(starts, 1);
    assert!(!panel.snapshot().listeners[0].snapshot.loading);
}
