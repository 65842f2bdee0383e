//! Headless control panel: one forwarder controller per configured listener,
//! listener management, plus the runtime's connection and aggregate controls.
//!
//! Store changes are rendered as log lines through broker subscriptions the
//! panel holds for its lifetime.

use crate::console::{ConsoleCommand, HELP};
use crate::error::PhantomError;

use client_core::broker::topics::{
    ClientConnected, ClientConnecting, ClientDisconnected, ForwarderStarted, ForwarderStopped,
    ForwardersStarted, ForwardersStarting, ForwardersStopped,
};
use client_core::broker::{EventBroker, Subscription};
use client_core::forwarder::{
    ForwarderController, ForwarderRegistry, ForwarderSnapshot, LifecycleOutcome,
};
use client_core::ipc::{EnvironmentInfo, IpcBridge, ListenerConfig};
use client_core::store::{AggregateForwardersState, Alert, ConnectionState, Runtime};

use common::{ErrorLocation, ListenerKey};

use std::collections::BTreeMap;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ListenerStatus {
    pub listen: ListenerKey,
    #[serde(flatten)]
    pub snapshot: ForwarderSnapshot,
}

/// Everything the `status` command prints.
#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    pub connection: ConnectionState,
    pub forwarders: AggregateForwardersState,
    pub listeners: Vec<ListenerStatus>,
    pub alert: Option<Alert>,
    pub environment: Option<EnvironmentInfo>,
}

type Controllers<B> = BTreeMap<ListenerKey, Arc<ForwarderController<B>>>;

/// Cheap to clone; clones share the controllers, so a command running on one
/// clone is visible (as `loading`) to the others.
pub struct ControlPanel<B: IpcBridge> {
    runtime: Runtime<B>,
    registry: ForwarderRegistry<B>,
    controllers: Arc<RwLock<Controllers<B>>>,
    _status_lines: Arc<Vec<Subscription>>,
}

// Derive would require `B: Clone`.
impl<B: IpcBridge> Clone for ControlPanel<B> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            registry: self.registry.clone(),
            controllers: Arc::clone(&self.controllers),
            _status_lines: Arc::clone(&self._status_lines),
        }
    }
}

impl<B: IpcBridge> ControlPanel<B> {
    pub fn new(runtime: Runtime<B>) -> Self {
        let status_lines = subscribe_status_lines(runtime.broker());
        let registry = ForwarderRegistry::new(
            Arc::clone(runtime.bridge()),
            runtime.alerts().clone(),
        );

        Self {
            runtime,
            registry,
            controllers: Arc::new(RwLock::new(BTreeMap::new())),
            _status_lines: Arc::new(status_lines),
        }
    }

    pub fn runtime(&self) -> &Runtime<B> {
        &self.runtime
    }

    /// Configured listen addresses, in order.
    pub fn listeners(&self) -> Vec<ListenerKey> {
        self.read_controllers().keys().cloned().collect()
    }

    /// Re-read the backend's listener list.
    ///
    /// Controllers of listeners still configured are kept (with any pending
    /// confirmation); new listeners get a controller hydrated from the
    /// backend; removed listeners are dropped. Returns the listener count.
    pub async fn refresh_listeners(&self) -> Result<usize, PhantomError> {
        let config = self.runtime.bridge().get_config().await?;

        let (added, count) = {
            let mut controllers = self.write_controllers();
            let mut previous = std::mem::take(&mut *controllers);
            let mut added = Vec::new();

            for listener in config.listeners {
                if controllers.contains_key(&listener.listen) {
                    warn!("Listener {} is configured twice", listener.listen);
                    continue;
                }

                let controller = match previous.remove(&listener.listen) {
                    Some(existing) => existing,
                    None => {
                        let controller = Arc::new(ForwarderController::new(
                            listener.listen.clone(),
                            Arc::clone(self.runtime.bridge()),
                            self.runtime.broker().clone(),
                            self.runtime.alerts().clone(),
                        ));
                        added.push(Arc::clone(&controller));
                        controller
                    }
                };
                controllers.insert(listener.listen, controller);
            }

            for removed in previous.keys() {
                info!("Listener {removed} is no longer configured");
            }

            (added, controllers.len())
        };

        for controller in added {
            // Logged by the controller; the listener shows as stopped.
            let _ = controller.hydrate().await;
        }

        info!("{count} listener(s) configured");
        Ok(count)
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            connection: self.runtime.connection().connection_state(),
            forwarders: self.runtime.forwarders().state(),
            listeners: self
                .read_controllers()
                .iter()
                .map(|(listen, controller)| ListenerStatus {
                    listen: listen.clone(),
                    snapshot: controller.snapshot(),
                })
                .collect(),
            alert: self.runtime.alerts().current(),
            environment: self.runtime.environment(),
        }
    }

    /// Run one console command. Returns text to print, if any.
    ///
    /// `Quit` is the caller's to handle; it is a no-op here.
    pub async fn execute(&self, command: ConsoleCommand) -> Result<Option<String>, PhantomError> {
        match command {
            ConsoleCommand::Toggle(key) => {
                let outcome = self.controller(&key)?.toggle().await?;
                Ok(Some(describe(&key, outcome)))
            }
            ConsoleCommand::Confirm(key) => {
                let outcome = self.controller(&key)?.confirm().await?;
                Ok(Some(describe(&key, outcome)))
            }
            ConsoleCommand::Cancel(key) => {
                let text = if self.controller(&key)?.cancel() {
                    format!("{key}: stop cancelled")
                } else {
                    format!("{key}: nothing to cancel")
                };
                Ok(Some(text))
            }
            ConsoleCommand::Add {
                listen,
                hostname,
                label,
            } => {
                let listener = ListenerConfig {
                    hostname,
                    label,
                    ..ListenerConfig::new(listen.clone())
                };
                self.registry.add(listener).await?;
                self.refresh_listeners().await?;
                Ok(Some(format!("{listen}: added")))
            }
            ConsoleCommand::Remove(key) => {
                self.registry.remove(&key).await?;
                self.refresh_listeners().await?;
                Ok(Some(format!("{key}: removed")))
            }
            ConsoleCommand::Label { listen, label } => {
                self.registry.relabel(&listen, label).await?;
                Ok(Some(format!("{listen}: label updated")))
            }
            ConsoleCommand::Nodes => {
                let nodes = self.registry.connected_nodes().await?;
                if nodes.is_empty() {
                    return Ok(Some(String::from("No forwarder is running")));
                }
                let lines: Vec<String> = nodes
                    .iter()
                    .map(|node| match node.label.as_str() {
                        "" => format!("(no label) via {}", node.via),
                        label => format!("{label} via {}", node.via),
                    })
                    .collect();
                Ok(Some(lines.join("\n")))
            }
            ConsoleCommand::Connect => {
                self.runtime.connect().await?;
                Ok(None)
            }
            ConsoleCommand::Disconnect => {
                self.runtime.disconnect().await?;
                Ok(None)
            }
            ConsoleCommand::StartAll => {
                self.runtime.start_all_forwarders().await?;
                Ok(None)
            }
            ConsoleCommand::StopAll => {
                self.runtime.stop_all_forwarders().await?;
                Ok(None)
            }
            ConsoleCommand::Reload => {
                let count = self.refresh_listeners().await?;
                self.runtime.reload_forwarders_status().await;
                Ok(Some(format!("{count} listener(s) configured")))
            }
            ConsoleCommand::Status => {
                let json = serde_json::to_string_pretty(&self.snapshot()).map_err(|e| {
                    PhantomError::Phantom {
                        message: format!("Failed to render status: {e}"),
                        location: ErrorLocation::from(Location::caller()),
                    }
                })?;
                Ok(Some(json))
            }
            ConsoleCommand::Help => Ok(Some(HELP.to_string())),
            ConsoleCommand::Quit => Ok(None),
        }
    }

    #[track_caller]
    fn controller(&self, key: &ListenerKey) -> Result<Arc<ForwarderController<B>>, PhantomError> {
        self.read_controllers()
            .get(key)
            .cloned()
            .ok_or_else(|| PhantomError::Console {
                message: format!("No listener {key} is configured (try `reload`)"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    fn read_controllers(&self) -> RwLockReadGuard<'_, Controllers<B>> {
        self.controllers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_controllers(&self) -> RwLockWriteGuard<'_, Controllers<B>> {
        self.controllers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn describe(key: &ListenerKey, outcome: LifecycleOutcome) -> String {
    match outcome {
        LifecycleOutcome::Busy => format!("{key}: busy, try again when the action completes"),
        LifecycleOutcome::AwaitingConfirmation => {
            format!("{key}: running; `confirm {key}` to stop or `cancel {key}` to keep it")
        }
        LifecycleOutcome::NothingPending => format!("{key}: no stop awaiting confirmation"),
        LifecycleOutcome::Issued(action) => format!("{key}: {action} requested"),
    }
}

fn subscribe_status_lines(broker: &EventBroker) -> Vec<Subscription> {
    vec![
        broker.subscribe::<ClientConnecting, _>(|_| info!("Backend connecting upstream")),
        broker.subscribe::<ClientConnected, _>(|_| info!("Backend connected")),
        broker.subscribe::<ClientDisconnected, _>(|_| info!("Backend disconnected")),
        broker.subscribe::<ForwarderStarted, _>(|key| info!("Forwarder {key} started")),
        broker.subscribe::<ForwarderStopped, _>(|key| info!("Forwarder {key} stopped")),
        broker.subscribe::<ForwardersStarting, _>(|_| info!("Starting all forwarders")),
        broker.subscribe::<ForwardersStarted, _>(|_| info!("All forwarders started")),
        broker.subscribe::<ForwardersStopped, _>(|_| info!("All forwarders stopped")),
    ]
}
