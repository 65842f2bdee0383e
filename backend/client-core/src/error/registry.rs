use crate::error::ipc::IpcError;
use crate::error::lifecycle::LifecycleError;

use common::{ErrorLocation, ListenerKey};

use std::fmt;

use thiserror::Error as ThisError;

/// Listener-management operation named in alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOperation {
    Add,
    Remove,
    Relabel,
}

impl fmt::Display for RegistryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryOperation::Add => write!(f, "add"),
            RegistryOperation::Remove => write!(f, "remove"),
            RegistryOperation::Relabel => write!(f, "relabel"),
        }
    }
}

#[derive(Debug, ThisError)]
pub enum RegistryError {
    /// The listen address could not be resolved to a backend index.
    #[error(transparent)]
    Resolve(#[from] LifecycleError),

    #[error("Command Error: failed to {operation} forwarder {key}: {source} {location}")]
    Command {
        operation: RegistryOperation,
        key: ListenerKey,
        location: ErrorLocation,
        #[source]
        source: IpcError,
    },

    #[error("Query Error: failed to list connected forwarders: {source} {location}")]
    Nodes {
        location: ErrorLocation,
        #[source]
        source: IpcError,
    },
}

impl RegistryError {
    /// Text shown in the alert surface.
    pub fn user_message(&self) -> String {
        match self {
            RegistryError::Resolve(error) => error.user_message(),
            RegistryError::Command {
                operation,
                key,
                source,
                ..
            } => format!("Failed to {operation} forwarder {key}: {}", source.message()),
            RegistryError::Nodes { source, .. } => {
                format!("Failed to list connected forwarders: {}", source.message())
            }
        }
    }
}
