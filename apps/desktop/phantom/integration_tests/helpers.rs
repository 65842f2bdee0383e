//! Test helpers for phantom integration tests.

use client_core::error::ipc::IpcError;
use client_core::ipc::{
    EnvironmentInfo, ForwarderNode, IpcBridge, IpcCommand, ListenerConfig, PhantomConfig,
};

use common::{ErrorLocation, ListenerKey};

use std::collections::HashSet;
use std::panic::Location;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Backend double with a mutable listener list and a recorded command log.
#[derive(Default)]
pub struct StubBridge {
    listeners: Mutex<Vec<ListenerConfig>>,
    started: Mutex<HashSet<ListenerKey>>,
    commands: Mutex<Vec<IpcCommand>>,
    failing: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl StubBridge {
    pub fn new(listeners: &[&str]) -> Arc<Self> {
        let bridge = Arc::new(Self::default());
        bridge.set_listeners(listeners);
        bridge
    }

    pub fn set_listeners(&self, listeners: &[&str]) {
        *self.listeners.lock().unwrap() = listeners
            .iter()
            .map(|listen| ListenerConfig::new(*listen))
            .collect();
    }

    pub fn set_started(&self, key: &str) {
        self.started.lock().unwrap().insert(ListenerKey::from(key));
    }

    /// Make every start/stop command fail with `message`.
    pub fn fail_commands(&self, message: &str) {
        *self.failing.lock().unwrap() = Some(message.to_string());
    }

    /// Hold start/stop commands until the returned `Notify` is notified.
    pub fn hold_commands(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn commands(&self) -> Vec<IpcCommand> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: IpcCommand) {
        self.commands.lock().unwrap().push(command);
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    #[track_caller]
    fn command_result(&self) -> Result<(), IpcError> {
        match self.failing.lock().unwrap().clone() {
            Some(message) => Err(IpcError::Backend {
                message,
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }
}

impl IpcBridge for StubBridge {
    async fn get_config(&self) -> Result<PhantomConfig, IpcError> {
        self.record(IpcCommand::GetConfig);
        Ok(PhantomConfig {
            listeners: self.listeners.lock().unwrap().clone(),
            ..PhantomConfig::default()
        })
    }

    async fn start_forwarder(&self, index: usize) -> Result<(), IpcError> {
        self.record(IpcCommand::StartForwarder(index));
        self.wait_for_gate().await;
        self.command_result()
    }

    async fn stop_forwarder(&self, index: usize) -> Result<(), IpcError> {
        self.record(IpcCommand::StopForwarder(index));
        self.wait_for_gate().await;
        self.command_result()
    }

    async fn all_forwarders_started(&self) -> Result<bool, IpcError> {
        self.record(IpcCommand::AllForwardersStarted);
        Ok(false)
    }

    async fn forwarder_started(&self, key: &ListenerKey) -> Result<bool, IpcError> {
        self.record(IpcCommand::ForwarderStarted(key.clone()));
        Ok(self.started.lock().unwrap().contains(key))
    }

    async fn connected_status(&self) -> Result<bool, IpcError> {
        self.record(IpcCommand::ConnectedStatus);
        Ok(false)
    }

    async fn get_environment(&self) -> Result<EnvironmentInfo, IpcError> {
        self.record(IpcCommand::GetEnvironment);
        Ok(EnvironmentInfo::default())
    }

    async fn start_client(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StartClient);
        Ok(())
    }

    async fn stop_client(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StopClient);
        Ok(())
    }

    async fn start_all_forwarders(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StartAllForwarders);
        Ok(())
    }

    async fn stop_all_forwarders(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StopAllForwarders);
        Ok(())
    }

    async fn add_forwarder(&self, listener: ListenerConfig) -> Result<(), IpcError> {
        self.record(IpcCommand::AddForwarder(listener.clone()));
        self.listeners.lock().unwrap().push(listener);
        Ok(())
    }

    async fn remove_forwarder(&self, index: usize) -> Result<(), IpcError> {
        self.record(IpcCommand::RemoveForwarder(index));
        let removed = self.listeners.lock().unwrap().remove(index);
        self.started.lock().unwrap().remove(&removed.listen);
        Ok(())
    }

    async fn update_forwarder_label(&self, index: usize, label: String) -> Result<(), IpcError> {
        self.record(IpcCommand::UpdateForwarderLabel(index, label.clone()));
        self.listeners.lock().unwrap()[index].label = label;
        Ok(())
    }

    async fn connected_forwarder_nodes(&self) -> Result<Vec<ForwarderNode>, IpcError> {
        self.record(IpcCommand::GetConnectedForwarderNodes);
        let started = self.started.lock().unwrap();
        Ok(self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .filter(|listener| started.contains(&listener.listen))
            .map(|listener| ForwarderNode {
                label: listener.label.clone(),
                via: String::from("gw-1.example:443"),
            })
            .collect())
    }

    fn signal_ready(&self) -> Result<(), IpcError> {
        Ok(())
    }
}
