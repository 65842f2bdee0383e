//! Forwarder Registry Resolver.

use crate::error::lifecycle::LifecycleError;
use crate::ipc::bridge::IpcBridge;

use common::{ErrorLocation, ListenerKey};

use std::panic::Location;
use std::sync::Arc;

use log::debug;

/// Resolves listen addresses against the backend's current configuration.
///
/// Nothing is cached: the configuration may change between two actions, and
/// the index sent with a command must match the configuration at that time.
pub struct ForwarderResolver<B: IpcBridge> {
    bridge: Arc<B>,
}

impl<B: IpcBridge> ForwarderResolver<B> {
    pub fn new(bridge: Arc<B>) -> Self {
        Self { bridge }
    }

    /// Index of the first configured listener whose address equals `key`.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Query`] if `GetConfig` fails
    /// - [`LifecycleError::NotFound`] if no listener matches
    pub async fn resolve_index(&self, key: &ListenerKey) -> Result<usize, LifecycleError> {
        let config = self
            .bridge
            .get_config()
            .await
            .map_err(|source| LifecycleError::Query {
                message: String::from("Failed to load forwarder configuration"),
                location: ErrorLocation::from(Location::caller()),
                source,
            })?;

        let index = config
            .index_of(key)
            .ok_or_else(|| LifecycleError::NotFound {
                key: key.clone(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        debug!("Resolved forwarder {key} to index {index}");
        Ok(index)
    }
}
