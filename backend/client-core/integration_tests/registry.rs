use crate::helpers::MockBridge;

use client_core::broker::EventBroker;
use client_core::error::lifecycle::LifecycleError;
use client_core::error::registry::{RegistryError, RegistryOperation};
use client_core::forwarder::{
    ForwarderController, ForwarderRegistry, LifecycleAction, LifecycleOutcome,
};
use client_core::ipc::{IpcCommand, ListenerConfig};
use client_core::store::{AlertLevel, AlertStore};

use common::ListenerKey;

use std::sync::Arc;

const WEB: &str = "127.0.0.1:8080";
const DB: &str = "127.0.0.1:5432";
const CACHE: &str = "127.0.0.1:6379";

fn registry(bridge: &Arc<MockBridge>, alerts: &AlertStore) -> ForwarderRegistry<MockBridge> {
    ForwarderRegistry::new(Arc::clone(bridge), alerts.clone())
}

fn registry_commands(bridge: &MockBridge) -> Vec<IpcCommand> {
    bridge
        .commands()
        .into_iter()
        .filter(|command| {
            matches!(
                command,
                IpcCommand::AddForwarder(_)
                    | IpcCommand::RemoveForwarder(_)
                    | IpcCommand::UpdateForwarderLabel(..)
            )
        })
        .collect()
}

/// **VALUE**: Verifies every removal resolves the index against the config as it is
/// at that moment.
///
/// **WHY THIS MATTERS**: Removing a listener shifts every later index down; an index
/// remembered from before the removal now names the next listener.
///
/// **BUG THIS CATCHES**: Would catch a cached index deleting or starting the wrong
/// forwarder after the list changed.
#[tokio::test]
async fn given_earlier_removal_when_removing_and_starting_then_fresh_indices_sent() {
    // GIVEN: WEB, DB, CACHE at 0, 1, 2
    let bridge = MockBridge::with_listeners(&[WEB, DB, CACHE]);
    let alerts = AlertStore::new();
    let registry = registry(&bridge, &alerts);
    let cache = ForwarderController::new(
        ListenerKey::from(CACHE),
        Arc::clone(&bridge),
        EventBroker::new(),
        alerts.clone(),
    );

    // WHEN: WEB is removed, then CACHE is started and removed
    let web_index = registry.remove(&ListenerKey::from(WEB)).await.unwrap();
    let outcome = cache.toggle().await.unwrap();
    let cache_index = registry.remove(&ListenerKey::from(CACHE)).await.unwrap();

    // THEN: CACHE moved from 2 to 1 and every command used its current position
    assert_eq!(web_index, 0);
    assert_eq!(outcome, LifecycleOutcome::Issued(LifecycleAction::Start));
    assert!(bridge.commands().contains(&IpcCommand::StartForwarder(1)));
    assert_eq!(cache_index, 1);
    assert_eq!(
        registry_commands(&bridge),
        vec![IpcCommand::RemoveForwarder(0), IpcCommand::RemoveForwarder(1)]
    );
    assert_eq!(
        bridge
            .listeners()
            .into_iter()
            .map(|listener| listener.listen)
            .collect::<Vec<_>>(),
        vec![ListenerKey::from(DB)]
    );
    assert!(alerts.current().is_none());
}

/// **VALUE**: Verifies removing an address the backend no longer has alerts and sends
/// no command.
///
/// **WHY THIS MATTERS**: Another client may already have removed it; a blind
/// `RemoveForwarder` would delete whatever sits at the old index.
///
/// **BUG THIS CATCHES**: Would catch NotFound being swallowed or a command sent anyway.
#[tokio::test]
async fn given_removed_listener_when_removed_again_then_not_found_and_no_command() {
    let bridge = MockBridge::with_listeners(&[WEB, DB]);
    let alerts = AlertStore::new();
    let registry = registry(&bridge, &alerts);
    registry.remove(&ListenerKey::from(WEB)).await.unwrap();

    // WHEN: Removing WEB a second time
    let result = registry.remove(&ListenerKey::from(WEB)).await;

    // THEN: Resolution failed, DB untouched
    assert!(matches!(
        result,
        Err(RegistryError::Resolve(LifecycleError::NotFound { .. }))
    ));
    assert_eq!(registry_commands(&bridge), vec![IpcCommand::RemoveForwarder(0)]);
    assert_eq!(bridge.listeners().len(), 1);
    assert_eq!(
        alerts.current().unwrap().message,
        format!("Forwarder {WEB} does not exist")
    );
}

/// **VALUE**: Verifies relabel resolves the index and carries the new label.
///
/// **WHY THIS MATTERS**: Labels are what `nodes` shows; the wrong index relabels
/// someone else's listener.
///
/// **BUG THIS CATCHES**: Would catch the label sent to a stale or hard-coded index.
#[tokio::test]
async fn given_listener_when_relabelled_then_label_updated_at_resolved_index() {
    let bridge = MockBridge::with_listeners(&[WEB, DB]);
    let alerts = AlertStore::new();
    let registry = registry(&bridge, &alerts);

    let index = registry
        .relabel(&ListenerKey::from(DB), String::from("postgres"))
        .await
        .unwrap();

    assert_eq!(index, 1);
    assert_eq!(
        registry_commands(&bridge),
        vec![IpcCommand::UpdateForwarderLabel(1, String::from("postgres"))]
    );
    assert_eq!(bridge.listeners()[1].label, "postgres");
    assert_eq!(bridge.listeners()[0].label, "");
}

/// **VALUE**: Verifies a rejected add alerts with the operation and the backend's reason.
///
/// **WHY THIS MATTERS**: Adding an address twice is a common typo; the user must see why
/// nothing happened.
///
/// **BUG THIS CATCHES**: Would catch the failure reported without the address or cause.
#[tokio::test]
async fn given_existing_address_when_added_then_alert_names_operation_and_cause() {
    let bridge = MockBridge::with_listeners(&[WEB]);
    let alerts = AlertStore::new();
    let registry = registry(&bridge, &alerts);

    let result = registry.add(ListenerConfig::new(WEB)).await;

    match result {
        Err(RegistryError::Command { operation, .. }) => {
            assert_eq!(operation, RegistryOperation::Add);
        }
        other => panic!("Expected Command error, got {other:?}"),
    }
    let alert = alerts.current().unwrap();
    assert_eq!(alert.level, AlertLevel::Error);
    assert_eq!(
        alert.message,
        format!("Failed to add forwarder {WEB}: listener with address {WEB} already exists")
    );
    assert_eq!(bridge.listeners().len(), 1);
}

/// **VALUE**: Verifies an added listener lands at the end of the backend list.
///
/// **WHY THIS MATTERS**: Existing indices stay valid after an add; only removals shift.
///
/// **BUG THIS CATCHES**: Would catch the listener config (label, hostname) being
/// dropped on the way to the backend.
#[tokio::test]
async fn given_new_address_when_added_then_appended_with_its_settings() {
    let bridge = MockBridge::with_listeners(&[WEB]);
    let alerts = AlertStore::new();
    let registry = registry(&bridge, &alerts);

    let mut listener = ListenerConfig::new(DB);
    listener.label = String::from("postgres");
    listener.hostname = String::from("db.example.com");
    registry.add(listener.clone()).await.unwrap();

    assert_eq!(
        registry_commands(&bridge),
        vec![IpcCommand::AddForwarder(listener.clone())]
    );
    assert_eq!(bridge.listeners()[1], listener);
    assert!(alerts.current().is_none());
}

/// **VALUE**: Verifies `connected_nodes` returns the backend's answer and alerts on
/// failure.
///
/// **WHY THIS MATTERS**: This is the only view of which gateway each tunnel uses.
///
/// **BUG THIS CATCHES**: Would catch a query failure returning an empty list silently.
#[tokio::test]
async fn given_running_forwarders_when_listing_nodes_then_labels_and_gateway() {
    let bridge = MockBridge::with_listeners(&[WEB, DB]);
    bridge.set_forwarder_started(DB);
    let alerts = AlertStore::new();
    let registry = registry(&bridge, &alerts);
    registry
        .relabel(&ListenerKey::from(DB), String::from("postgres"))
        .await
        .unwrap();

    let nodes = registry.connected_nodes().await.unwrap();

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].label, "postgres");
    assert_eq!(nodes[0].via, "gateway.example:443");

    // WHEN: The backend cannot answer
    bridge.fail("GetConnectedForwarderNodes", "backend unreachable");
    let result = registry.connected_nodes().await;

    // THEN: Typed error and alert
    assert!(matches!(result, Err(RegistryError::Nodes { .. })));
    assert_eq!(
        alerts.current().unwrap().message,
        "Failed to list connected forwarders: backend unreachable"
    );
}
