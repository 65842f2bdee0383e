use crate::error::ipc::IpcError;
use crate::forwarder::LifecycleAction;

use common::{ErrorLocation, ListenerKey};

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LifecycleError {
    /// The listen address is not in the backend's current configuration.
    #[error("Not Found Error: forwarder {key} does not exist {location}")]
    NotFound {
        key: ListenerKey,
        location: ErrorLocation,
    },

    #[error("Query Error: {message} {location}")]
    Query {
        message: String,
        location: ErrorLocation,
        #[source]
        source: IpcError,
    },

    #[error("Command Error: failed to {action} forwarder {key}: {source} {location}")]
    Command {
        action: LifecycleAction,
        key: ListenerKey,
        location: ErrorLocation,
        #[source]
        source: IpcError,
    },
}

impl LifecycleError {
    /// Text shown in the alert surface.
    pub fn user_message(&self) -> String {
        match self {
            LifecycleError::NotFound { key, .. } => format!("Forwarder {key} does not exist"),
            LifecycleError::Query { message, source, .. } => {
                format!("{message}: {}", source.message())
            }
            LifecycleError::Command {
                action,
                key,
                source,
                ..
            } => format!("Failed to {action} forwarder {key}: {}", source.message()),
        }
    }
}
