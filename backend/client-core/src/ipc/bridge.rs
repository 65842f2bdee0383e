//! Client side of the IPC contract.

use crate::error::ipc::IpcError;
use crate::ipc::protocol::{
    EnvironmentInfo, ForwarderNode, ListenerConfig, PhantomConfig, PushEvent,
};

use common::ListenerKey;

use std::future::Future;

use tokio::sync::mpsc::UnboundedReceiver;

/// Push-events as they arrive from the backend, in arrival order.
pub type PushEventStream = UnboundedReceiver<PushEvent>;

/// Request/response access to the backend.
///
/// Every call is one round trip and a suspension point for the caller.
/// Push-events travel separately, on the [`PushEventStream`] handed out by
/// the transport when it connects.
pub trait IpcBridge: Send + Sync + 'static {
    /// Current listener configuration, in backend index order.
    fn get_config(&self) -> impl Future<Output = Result<PhantomConfig, IpcError>> + Send;

    fn start_forwarder(&self, index: usize) -> impl Future<Output = Result<(), IpcError>> + Send;

    fn stop_forwarder(&self, index: usize) -> impl Future<Output = Result<(), IpcError>> + Send;

    fn all_forwarders_started(&self) -> impl Future<Output = Result<bool, IpcError>> + Send;

    fn forwarder_started(
        &self,
        key: &ListenerKey,
    ) -> impl Future<Output = Result<bool, IpcError>> + Send;

    fn connected_status(&self) -> impl Future<Output = Result<bool, IpcError>> + Send;

    fn get_environment(&self) -> impl Future<Output = Result<EnvironmentInfo, IpcError>> + Send;

    /// Ask the backend to connect upstream.
    fn start_client(&self) -> impl Future<Output = Result<(), IpcError>> + Send;

    /// Ask the backend to drop its upstream connection.
    fn stop_client(&self) -> impl Future<Output = Result<(), IpcError>> + Send;

    fn start_all_forwarders(&self) -> impl Future<Output = Result<(), IpcError>> + Send;

    fn stop_all_forwarders(&self) -> impl Future<Output = Result<(), IpcError>> + Send;

    /// Append a listener to the backend configuration and start it.
    fn add_forwarder(
        &self,
        listener: ListenerConfig,
    ) -> impl Future<Output = Result<(), IpcError>> + Send;

    /// Stop and delete the listener at `index`. Later indices shift down.
    fn remove_forwarder(&self, index: usize) -> impl Future<Output = Result<(), IpcError>> + Send;

    fn update_forwarder_label(
        &self,
        index: usize,
        label: String,
    ) -> impl Future<Output = Result<(), IpcError>> + Send;

    /// Running forwarders and the gateway node each one goes through.
    fn connected_forwarder_nodes(
        &self,
    ) -> impl Future<Output = Result<Vec<ForwarderNode>, IpcError>> + Send;

    /// Tell the backend it may start pushing state. Fire-and-forget.
    fn signal_ready(&self) -> Result<(), IpcError>;
}
