//! Wire types shared with the backend.
//!
//! Frames are JSON text messages tagged by `type`:
//!
//! ```text
//! client  -> backend  {"type":"request","id":1,"command":{"name":"StartForwarder","args":2}}
//! client  -> backend  {"type":"signal","name":"broker:Ready"}
//! backend -> client   {"type":"response","id":1,"ok":null}
//! backend -> client   {"type":"response","id":1,"error":"tunnel index out of bound"}
//! backend -> client   {"type":"event","name":"forwarder:Started","data":"127.0.0.1:8080"}
//! ```

use common::ListenerKey;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Signal telling the backend that push-event routing is installed.
pub const CLIENT_READY_SIGNAL: &str = "broker:Ready";

/// One forwarder as configured on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub listen: ListenerKey,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, rename = "tcp")]
    pub use_tcp: bool,
}

impl ListenerConfig {
    pub fn new(listen: impl Into<ListenerKey>) -> Self {
        Self {
            listen: listen.into(),
            label: String::new(),
            hostname: String::new(),
            insecure: false,
            use_tcp: false,
        }
    }
}

/// Backend configuration returned by `GetConfig`.
///
/// Listener order is significant: a listener's position is the index the
/// backend expects in `StartForwarder`, `StopForwarder`, `RemoveForwarder`
/// and `UpdateForwaderLabel`. Adding or removing a listener shifts it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhantomConfig {
    #[serde(default)]
    pub listeners: Vec<ListenerConfig>,
    #[serde(default)]
    pub listen_on_start: bool,
    #[serde(default)]
    pub connect_on_start: bool,
    #[serde(default, rename = "specterInsecure")]
    pub specter_insecure_skip_verify: bool,
}

impl PhantomConfig {
    /// Position of the first listener bound to `key`.
    pub fn index_of(&self, key: &ListenerKey) -> Option<usize> {
        self.listeners
            .iter()
            .position(|listener| listener.listen == *key)
    }
}

/// A running forwarder as reported by `GetConnectedForwarderNodes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderNode {
    #[serde(default)]
    pub label: String,
    /// Gateway node the forwarder tunnels through.
    #[serde(default)]
    pub via: String,
}

/// Build and host description returned by `GetEnvironment`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    #[serde(default)]
    pub build_type: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub arch: String,
}

/// Backend-initiated notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "data")]
pub enum PushEvent {
    #[serde(rename = "specter:Connecting")]
    ClientConnecting,
    #[serde(rename = "specter:Connected")]
    ClientConnected,
    #[serde(rename = "specter:Disconnected")]
    ClientDisconnected,
    #[serde(rename = "forwarder:Started")]
    ForwarderStarted(ListenerKey),
    #[serde(rename = "forwarder:Stopped")]
    ForwarderStopped(ListenerKey),
    #[serde(rename = "forwarders:Starting")]
    ForwardersStarting,
    #[serde(rename = "forwarders:Started")]
    ForwardersStarted,
    #[serde(rename = "forwarders:Stopped")]
    ForwardersStopped,
}

/// Request/response calls the backend understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "args")]
pub enum IpcCommand {
    GetConfig,
    StartForwarder(usize),
    StopForwarder(usize),
    AllForwardersStarted,
    ForwarderStarted(ListenerKey),
    ConnectedStatus,
    GetEnvironment,
    StartClient,
    StopClient,
    StartAllForwarders,
    StopAllForwarders,
    AddForwarder(ListenerConfig),
    RemoveForwarder(usize),
    /// `"args":[index,label]`; wire name keeps the backend's spelling.
    #[serde(rename = "UpdateForwaderLabel")]
    UpdateForwarderLabel(usize, String),
    GetConnectedForwarderNodes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Request { id: u64, command: IpcCommand },
    Signal { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Response {
        id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ok: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Event(PushEvent),
}
