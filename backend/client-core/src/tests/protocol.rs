// Unit tests for the IPC wire format

use crate::ipc::protocol::{
    CLIENT_READY_SIGNAL, ClientMessage, ForwarderNode, IpcCommand, ListenerConfig, PhantomConfig,
    PushEvent, ServerMessage,
};

use common::ListenerKey;

use serde_json::json;

/// **VALUE**: Verifies request frames carry the command name and argument in the
/// documented shape.
///
/// **WHY THIS MATTERS**: The backend dispatches on `command.name` and reads the index
/// from `command.args`. Any drift silently breaks start/stop.
///
/// **BUG THIS CATCHES**: Would catch a change of enum tagging (externally tagged would
/// produce `{"StartForwarder":2}`).
#[test]
fn given_request_when_serialized_then_matches_wire_shape() {
    // GIVEN: A command with and one without an argument
    let start = ClientMessage::Request {
        id: 4,
        command: IpcCommand::StartForwarder(2),
    };
    let config = ClientMessage::Request {
        id: 5,
        command: IpcCommand::GetConfig,
    };

    // WHEN/THEN: Serialized forms match the contract
    assert_eq!(
        serde_json::to_value(&start).unwrap(),
        json!({"type": "request", "id": 4, "command": {"name": "StartForwarder", "args": 2}})
    );
    assert_eq!(
        serde_json::to_value(&config).unwrap(),
        json!({"type": "request", "id": 5, "command": {"name": "GetConfig"}})
    );
}

/// **VALUE**: Verifies the listener-management commands keep the backend's names and
/// argument shapes.
///
/// **WHY THIS MATTERS**: `UpdateForwaderLabel` is misspelled on the backend and takes two
/// positional arguments; `AddForwarder` carries a whole listener object.
///
/// **BUG THIS CATCHES**: Would catch the label command sent under a corrected name the
/// backend does not know, or the listener fields renamed.
#[test]
fn given_listener_management_commands_when_serialized_then_match_backend_names() {
    let mut listener = ListenerConfig::new("127.0.0.1:5432");
    listener.label = String::from("postgres");
    listener.use_tcp = true;

    let cases = [
        (
            IpcCommand::UpdateForwarderLabel(1, String::from("db")),
            json!({"name": "UpdateForwaderLabel", "args": [1, "db"]}),
        ),
        (
            IpcCommand::RemoveForwarder(3),
            json!({"name": "RemoveForwarder", "args": 3}),
        ),
        (
            IpcCommand::AddForwarder(listener),
            json!({"name": "AddForwarder", "args": {
                "listen": "127.0.0.1:5432",
                "label": "postgres",
                "hostname": "",
                "insecure": false,
                "tcp": true
            }}),
        ),
        (
            IpcCommand::GetConnectedForwarderNodes,
            json!({"name": "GetConnectedForwarderNodes"}),
        ),
    ];

    for (command, expected) in cases {
        assert_eq!(serde_json::to_value(&command).unwrap(), expected);
    }

    let nodes: Vec<ForwarderNode> =
        serde_json::from_value(json!([{"label": "db", "via": "gw-1.example:443"}])).unwrap();
    assert_eq!(nodes[0].via, "gw-1.example:443");
}

/// **VALUE**: Verifies the ready signal frame.
///
/// **WHY THIS MATTERS**: The backend holds back its state pushes until it sees this
/// exact name.
///
/// **BUG THIS CATCHES**: Would catch a renamed constant or tag.
#[test]
fn given_ready_signal_when_serialized_then_uses_broker_ready_name() {
    let signal = ClientMessage::Signal {
        name: CLIENT_READY_SIGNAL.to_string(),
    };

    assert_eq!(
        serde_json::to_value(&signal).unwrap(),
        json!({"type": "signal", "name": "broker:Ready"})
    );
}

/// **VALUE**: Verifies all eight push-event wire names decode to their variants.
///
/// **WHY THIS MATTERS**: The names are shared with the backend; one typo and the event
/// is dropped as unknown.
///
/// **BUG THIS CATCHES**: Would catch a missing or misspelled `#[serde(rename)]`.
#[test]
fn given_event_frames_when_decoded_then_map_to_push_events() {
    let cases = [
        (json!({"name": "specter:Connecting"}), PushEvent::ClientConnecting),
        (json!({"name": "specter:Connected"}), PushEvent::ClientConnected),
        (json!({"name": "specter:Disconnected"}), PushEvent::ClientDisconnected),
        (
            json!({"name": "forwarder:Started", "data": "127.0.0.1:80"}),
            PushEvent::ForwarderStarted(ListenerKey::from("127.0.0.1:80")),
        ),
        (
            json!({"name": "forwarder:Stopped", "data": "127.0.0.1:80"}),
            PushEvent::ForwarderStopped(ListenerKey::from("127.0.0.1:80")),
        ),
        (json!({"name": "forwarders:Starting"}), PushEvent::ForwardersStarting),
        (json!({"name": "forwarders:Started"}), PushEvent::ForwardersStarted),
        (json!({"name": "forwarders:Stopped"}), PushEvent::ForwardersStopped),
    ];

    for (mut frame, expected) in cases {
        frame["type"] = json!("event");
        let decoded: ServerMessage = serde_json::from_value(frame.clone()).unwrap();
        assert_eq!(decoded, ServerMessage::Event(expected), "frame {frame}");
    }
}

/// **VALUE**: Verifies `GetConfig` answers decode with defaults for missing fields and
/// unknown fields ignored.
///
/// **WHY THIS MATTERS**: The backend config carries more than the client reads; older
/// configs lack newer flags.
///
/// **BUG THIS CATCHES**: Would catch `deny_unknown_fields` or a missing `#[serde(default)]`.
#[test]
fn given_partial_backend_config_when_decoded_then_defaults_fill_gaps() {
    // GIVEN: A config with an extra field and a sparse listener
    let value = json!({
        "listeners": [
            {"listen": "127.0.0.1:8080", "label": "web", "tcp": true},
            {"listen": "127.0.0.1:5432"}
        ],
        "listenOnStart": true,
        "specterInsecure": true,
        "unrelated": 42
    });

    // WHEN: Decoding
    let config: PhantomConfig = serde_json::from_value(value).unwrap();

    // THEN: Known fields are read, missing ones default
    assert_eq!(config.listeners.len(), 2);
    assert_eq!(config.listeners[0].label, "web");
    assert!(config.listeners[0].use_tcp);
    assert!(!config.listeners[1].insecure);
    assert!(config.listen_on_start);
    assert!(!config.connect_on_start);
    assert!(config.specter_insecure_skip_verify);
    assert_eq!(
        config.index_of(&ListenerKey::from("127.0.0.1:5432")),
        Some(1)
    );
}
