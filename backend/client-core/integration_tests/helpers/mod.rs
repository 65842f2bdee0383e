//! Test helpers for client-core integration tests.
//!
//! - [`MockBridge`] - in-memory [`IpcBridge`] recording every command
//! - [`backend`] - throwaway WebSocket backend for transport tests

pub mod backend;

use client_core::error::ipc::IpcError;
use client_core::ipc::{
    EnvironmentInfo, ForwarderNode, IpcBridge, IpcCommand, ListenerConfig, PhantomConfig,
};

use common::{ErrorLocation, ListenerKey};

use std::collections::{HashMap, HashSet};
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

/// Name of a command as it appears on the wire, used to inject failures.
pub fn command_name(command: &IpcCommand) -> &'static str {
    match command {
        IpcCommand::GetConfig => "GetConfig",
        IpcCommand::StartForwarder(_) => "StartForwarder",
        IpcCommand::StopForwarder(_) => "StopForwarder",
        IpcCommand::AllForwardersStarted => "AllForwardersStarted",
        IpcCommand::ForwarderStarted(_) => "ForwarderStarted",
        IpcCommand::ConnectedStatus => "ConnectedStatus",
        IpcCommand::GetEnvironment => "GetEnvironment",
        IpcCommand::StartClient => "StartClient",
        IpcCommand::StopClient => "StopClient",
        IpcCommand::StartAllForwarders => "StartAllForwarders",
        IpcCommand::StopAllForwarders => "StopAllForwarders",
        IpcCommand::AddForwarder(_) => "AddForwarder",
        IpcCommand::RemoveForwarder(_) => "RemoveForwarder",
        IpcCommand::UpdateForwarderLabel(..) => "UpdateForwaderLabel",
        IpcCommand::GetConnectedForwarderNodes => "GetConnectedForwarderNodes",
    }
}

/// In-memory backend double.
///
/// Answers come from plain fields the test sets up front; every call is
/// recorded in order. Start/stop commands can be held open with
/// [`MockBridge::hold_commands`] to observe the in-flight state.
#[derive(Default)]
pub struct MockBridge {
    config: Mutex<PhantomConfig>,
    environment: Mutex<EnvironmentInfo>,
    connected: AtomicBool,
    all_started: AtomicBool,
    started: Mutex<HashSet<ListenerKey>>,
    failures: Mutex<HashMap<&'static str, String>>,
    commands: Mutex<Vec<IpcCommand>>,
    gate: Mutex<Option<Arc<Notify>>>,
    ready_signals: AtomicUsize,
}

impl MockBridge {
    pub fn with_listeners(listeners: &[&str]) -> Arc<Self> {
        let bridge = Self::default();
        bridge.config.lock().unwrap().listeners = listeners
            .iter()
            .map(|listen| ListenerConfig::new(*listen))
            .collect();
        Arc::new(bridge)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_all_started(&self, started: bool) {
        self.all_started.store(started, Ordering::SeqCst);
    }

    pub fn set_forwarder_started(&self, key: &str) {
        self.started.lock().unwrap().insert(ListenerKey::from(key));
    }

    pub fn set_environment(&self, environment: EnvironmentInfo) {
        *self.environment.lock().unwrap() = environment;
    }

    /// Make every call of `command` fail with a backend error carrying `message`.
    pub fn fail(&self, command: &'static str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(command, message.to_string());
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

    /// Recorded start/stop commands only.
    pub fn lifecycle_commands(&self) -> Vec<IpcCommand> {
        self.commands()
            .into_iter()
            .filter(|command| {
                matches!(
                    command,
                    IpcCommand::StartForwarder(_) | IpcCommand::StopForwarder(_)
                )
            })
            .collect()
    }

    /// Listen addresses in backend index order.
    pub fn listeners(&self) -> Vec<ListenerConfig> {
        self.config.lock().unwrap().listeners.clone()
    }

    pub fn ready_signals(&self) -> usize {
        self.ready_signals.load(Ordering::SeqCst)
    }

    #[track_caller]
    fn record(&self, command: IpcCommand) -> Result<(), IpcError> {
        let name = command_name(&command);
        self.commands.lock().unwrap().push(command);

        match self.failures.lock().unwrap().get(name) {
            Some(message) => Err(IpcError::Backend {
                message: message.clone(),
                location: ErrorLocation::from(Location::caller()),
            }),
            None => Ok(()),
        }
    }

    #[track_caller]
    fn check_index(&self, index: usize) -> Result<(), IpcError> {
        if index < self.config.lock().unwrap().listeners.len() {
            return Ok(());
        }
        Err(IpcError::Backend {
            message: String::from("tunnel index out of bound"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn wait_for_gate(&self) {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

impl IpcBridge for MockBridge {
    async fn get_config(&self) -> Result<PhantomConfig, IpcError> {
        self.record(IpcCommand::GetConfig)?;
        Ok(self.config.lock().unwrap().clone())
    }

    async fn start_forwarder(&self, index: usize) -> Result<(), IpcError> {
        let recorded = self.record(IpcCommand::StartForwarder(index));
        self.wait_for_gate().await;
        recorded
    }

    async fn stop_forwarder(&self, index: usize) -> Result<(), IpcError> {
        let recorded = self.record(IpcCommand::StopForwarder(index));
        self.wait_for_gate().await;
        recorded
    }

    async fn all_forwarders_started(&self) -> Result<bool, IpcError> {
        self.record(IpcCommand::AllForwardersStarted)?;
        Ok(self.all_started.load(Ordering::SeqCst))
    }

    async fn forwarder_started(&self, key: &ListenerKey) -> Result<bool, IpcError> {
        self.record(IpcCommand::ForwarderStarted(key.clone()))?;
        Ok(self.started.lock().unwrap().contains(key))
    }

    async fn connected_status(&self) -> Result<bool, IpcError> {
        self.record(IpcCommand::ConnectedStatus)?;
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn get_environment(&self) -> Result<EnvironmentInfo, IpcError> {
        self.record(IpcCommand::GetEnvironment)?;
        Ok(self.environment.lock().unwrap().clone())
    }

    async fn start_client(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StartClient)
    }

    async fn stop_client(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StopClient)
    }

    async fn start_all_forwarders(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StartAllForwarders)
    }

    async fn stop_all_forwarders(&self) -> Result<(), IpcError> {
        self.record(IpcCommand::StopAllForwarders)
    }

    async fn add_forwarder(&self, listener: ListenerConfig) -> Result<(), IpcError> {
        self.record(IpcCommand::AddForwarder(listener.clone()))?;
        let mut config = self.config.lock().unwrap();
        if config.index_of(&listener.listen).is_some() {
            return Err(IpcError::Backend {
                message: format!("listener with address {} already exists", listener.listen),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        config.listeners.push(listener);
        Ok(())
    }

    async fn remove_forwarder(&self, index: usize) -> Result<(), IpcError> {
        self.record(IpcCommand::RemoveForwarder(index))?;
        self.check_index(index)?;
        let removed = self.config.lock().unwrap().listeners.remove(index);
        self.started.lock().unwrap().remove(&removed.listen);
        Ok(())
    }

    async fn update_forwarder_label(&self, index: usize, label: String) -> Result<(), IpcError> {
        self.record(IpcCommand::UpdateForwarderLabel(index, label.clone()))?;
        self.check_index(index)?;
        self.config.lock().unwrap().listeners[index].label = label;
        Ok(())
    }

    async fn connected_forwarder_nodes(&self) -> Result<Vec<ForwarderNode>, IpcError> {
        self.record(IpcCommand::GetConnectedForwarderNodes)?;
        let started = self.started.lock().unwrap();
        Ok(self
            .listeners()
            .into_iter()
            .filter(|listener| started.contains(&listener.listen))
            .map(|listener| ForwarderNode {
                label: listener.label,
                via: String::from("gateway.example:443"),
            })
            .collect())
    }

    fn signal_ready(&self) -> Result<(), IpcError> {
        self.ready_signals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
