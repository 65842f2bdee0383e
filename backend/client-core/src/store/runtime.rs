//! Runtime: owns the backend-mirroring stores and routes push-events.
//!
//! # Startup sequence
//!
//! 1. The caller spawns [`Runtime::pump`] on the transport's push-event
//!    stream, so routing is installed before anything is asked.
//! 2. [`Runtime::start`] seeds the environment, the connection state and the
//!    aggregate forwarders state. Each seed answer goes through the same
//!    reducer as the push-events, in arrival order.
//! 3. [`Runtime::start`] sends the `ready` signal. The backend may only
//!    start pushing state after it.
//!
//! A failed seed is logged and the store keeps its default.

use crate::broker::EventBroker;
use crate::broker::topics::{ForwarderStarted, ForwarderStopped};
use crate::error::ipc::IpcError;
use crate::ipc::bridge::{IpcBridge, PushEventStream};
use crate::ipc::protocol::{EnvironmentInfo, PushEvent};
use crate::store::aggregate::{AggregateSignal, ForwardersStore};
use crate::store::alert::{AlertLevel, AlertStore};
use crate::store::connection::{ConnectionSignal, ConnectionStore};

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, warn};

pub struct Runtime<B: IpcBridge> {
    bridge: Arc<B>,
    broker: EventBroker,
    alerts: AlertStore,
    connection: ConnectionStore,
    forwarders: ForwardersStore,
    environment: Arc<RwLock<Option<EnvironmentInfo>>>,
}

// Derive would require `B: Clone`.
impl<B: IpcBridge> Clone for Runtime<B> {
    fn clone(&self) -> Self {
        Self {
            bridge: Arc::clone(&self.bridge),
            broker: self.broker.clone(),
            alerts: self.alerts.clone(),
            connection: self.connection.clone(),
            forwarders: self.forwarders.clone(),
            environment: Arc::clone(&self.environment),
        }
    }
}

impl<B: IpcBridge> Runtime<B> {
    pub fn new(bridge: Arc<B>, broker: EventBroker, alerts: AlertStore) -> Self {
        Self {
            connection: ConnectionStore::new(broker.clone()),
            forwarders: ForwardersStore::new(broker.clone()),
            bridge,
            broker,
            alerts,
            environment: Arc::new(RwLock::new(None)),
        }
    }

    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    pub fn broker(&self) -> &EventBroker {
        &self.broker
    }

    pub fn alerts(&self) -> &AlertStore {
        &self.alerts
    }

    pub fn connection(&self) -> &ConnectionStore {
        &self.connection
    }

    pub fn forwarders(&self) -> &ForwardersStore {
        &self.forwarders
    }

    /// Environment reported by the backend, once seeded.
    pub fn environment(&self) -> Option<EnvironmentInfo> {
        self.environment
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reduce one inbound push-event.
    pub fn dispatch(&self, event: PushEvent) {
        debug!("Dispatching {event:?}");

        match event {
            PushEvent::ClientConnecting => {
                self.connection.apply(ConnectionSignal::Connecting);
            }
            PushEvent::ClientConnected => {
                self.connection.apply(ConnectionSignal::Connected);
            }
            PushEvent::ClientDisconnected => {
                self.connection.apply(ConnectionSignal::Disconnected);
            }
            PushEvent::ForwarderStarted(key) => self.broker.publish::<ForwarderStarted>(key),
            PushEvent::ForwarderStopped(key) => self.broker.publish::<ForwarderStopped>(key),
            PushEvent::ForwardersStarting => {
                self.forwarders.apply(AggregateSignal::Starting);
            }
            PushEvent::ForwardersStarted => {
                self.forwarders.apply(AggregateSignal::Started);
            }
            PushEvent::ForwardersStopped => {
                self.forwarders.apply(AggregateSignal::Stopped);
            }
        }
    }

    /// Drain `events` into [`dispatch`](Self::dispatch) until the transport
    /// closes the stream.
    pub async fn pump(self, mut events: PushEventStream) {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
        info!("Push-event stream closed");
    }

    /// Seed every store, then signal `ready`.
    ///
    /// # Errors
    ///
    /// Only a failure to send the `ready` signal is returned; seed failures
    /// are logged.
    pub async fn start(&self) -> Result<(), IpcError> {
        match self.bridge.get_environment().await {
            Ok(environment) => {
                info!(
                    "Backend environment: {} build on {}/{}",
                    environment.build_type, environment.platform, environment.arch
                );
                *self
                    .environment
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = Some(environment);
            }
            Err(e) => warn!("Failed to query environment: {e}"),
        }

        if let Err(e) = self.connection.seed(self.bridge.as_ref()).await {
            warn!("Failed to seed connection state, assuming disconnected: {e}");
        }

        if let Err(e) = self.forwarders.reload_status(self.bridge.as_ref()).await {
            warn!("Failed to seed forwarders state, assuming stopped: {e}");
        }

        self.bridge.signal_ready()
    }

    /// Re-query the aggregate forwarders state, alerting on failure.
    pub async fn reload_forwarders_status(&self) {
        if let Err(e) = self.forwarders.reload_status(self.bridge.as_ref()).await {
            self.alert_failure("Failed to query forwarders status", &e);
        }
    }

    /// Ask the backend to connect upstream. State follows the push-events.
    pub async fn connect(&self) -> Result<(), IpcError> {
        self.bridge
            .start_client()
            .await
            .inspect_err(|e| self.alert_failure("Failed to connect", e))
    }

    /// Ask the backend to disconnect upstream. State follows the push-events.
    pub async fn disconnect(&self) -> Result<(), IpcError> {
        self.bridge
            .stop_client()
            .await
            .inspect_err(|e| self.alert_failure("Failed to disconnect", e))
    }

    pub async fn start_all_forwarders(&self) -> Result<(), IpcError> {
        self.bridge
            .start_all_forwarders()
            .await
            .inspect_err(|e| self.alert_failure("Failed to start forwarders", e))
    }

    pub async fn stop_all_forwarders(&self) -> Result<(), IpcError> {
        self.bridge
            .stop_all_forwarders()
            .await
            .inspect_err(|e| self.alert_failure("Failed to stop forwarders", e))
    }

    fn alert_failure(&self, what: &str, error: &IpcError) {
        self.alerts
            .show(AlertLevel::Error, format!("{what}: {}", error.message()));
    }
}
