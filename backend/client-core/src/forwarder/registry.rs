//! Listener management: add, remove and relabel backend listeners.
//!
//! Removing a listener shifts every later index down by one, and adding one
//! appends at the end. Remove and relabel therefore resolve their index
//! through [`ForwarderResolver`] right before the command, like the
//! lifecycle controller does for start and stop.

use crate::error::registry::{RegistryError, RegistryOperation};
use crate::forwarder::resolver::ForwarderResolver;
use crate::ipc::bridge::IpcBridge;
use crate::ipc::protocol::{ForwarderNode, ListenerConfig};
use crate::store::alert::{AlertLevel, AlertStore};

use common::{ErrorLocation, ListenerKey};

use std::panic::Location;
use std::sync::Arc;

use log::{debug, info};

pub struct ForwarderRegistry<B: IpcBridge> {
    bridge: Arc<B>,
    resolver: ForwarderResolver<B>,
    alerts: AlertStore,
}

// Derive would require `B: Clone`.
impl<B: IpcBridge> Clone for ForwarderRegistry<B> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.bridge), self.alerts.clone())
    }
}

impl<B: IpcBridge> ForwarderRegistry<B> {
    pub fn new(bridge: Arc<B>, alerts: AlertStore) -> Self {
        Self {
            resolver: ForwarderResolver::new(Arc::clone(&bridge)),
            bridge,
            alerts,
        }
    }

    /// Ask the backend to add and start `listener`.
    ///
    /// The backend rejects an address that is already configured.
    pub async fn add(&self, listener: ListenerConfig) -> Result<(), RegistryError> {
        let key = listener.listen.clone();
        info!("Adding forwarder {key}");

        self.bridge
            .add_forwarder(listener)
            .await
            .map_err(|source| RegistryError::Command {
                operation: RegistryOperation::Add,
                key,
                location: ErrorLocation::from(Location::caller()),
                source,
            })
            .inspect_err(|e| self.alert(e))
    }

    /// Stop and delete the listener bound to `key`. Returns the index it had.
    pub async fn remove(&self, key: &ListenerKey) -> Result<usize, RegistryError> {
        let result = self.remove_resolved(key).await;
        result.inspect_err(|e| self.alert(e))
    }

    /// Change the label of the listener bound to `key`. Returns its index.
    pub async fn relabel(&self, key: &ListenerKey, label: String) -> Result<usize, RegistryError> {
        let result = self.relabel_resolved(key, label).await;
        result.inspect_err(|e| self.alert(e))
    }

    /// Forwarders currently running on the backend, with their gateway node.
    pub async fn connected_nodes(&self) -> Result<Vec<ForwarderNode>, RegistryError> {
        self.bridge
            .connected_forwarder_nodes()
            .await
            .map_err(|source| RegistryError::Nodes {
                location: ErrorLocation::from(Location::caller()),
                source,
            })
            .inspect_err(|e| self.alert(e))
    }

    async fn remove_resolved(&self, key: &ListenerKey) -> Result<usize, RegistryError> {
        let index = self.resolver.resolve_index(key).await?;
        info!("Removing forwarder {key} at index {index}");

        self.bridge
            .remove_forwarder(index)
            .await
            .map_err(|source| RegistryError::Command {
                operation: RegistryOperation::Remove,
                key: key.clone(),
                location: ErrorLocation::from(Location::caller()),
                source,
            })?;

        Ok(index)
    }

    async fn relabel_resolved(
        &self,
        key: &ListenerKey,
        label: String,
    ) -> Result<usize, RegistryError> {
        let index = self.resolver.resolve_index(key).await?;
        debug!("Relabelling forwarder {key} at index {index} to {label:?}");

        self.bridge
            .update_forwarder_label(index, label)
            .await
            .map_err(|source| RegistryError::Command {
                operation: RegistryOperation::Relabel,
                key: key.clone(),
                location: ErrorLocation::from(Location::caller()),
                source,
            })?;

        Ok(index)
    }

    fn alert(&self, error: &RegistryError) {
        self.alerts.show(AlertLevel::Error, error.user_message());
    }
}
