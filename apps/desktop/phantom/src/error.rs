use client_core::error::config::ConfigError;
use client_core::error::ipc::IpcError;
use client_core::error::lifecycle::LifecycleError;
use client_core::error::registry::RegistryError;

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the console front-end.
///
/// Core errors are flattened to their message so the whole enum stays
/// serializable for the `status` JSON output.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PhantomError {
    /// Error from this App
    #[error("Phantom Error: {message} {location}")]
    Phantom {
        message: String,
        location: ErrorLocation,
    },

    /// Error from client-core operations (IPC, lifecycle, registry, config)
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// Malformed console input
    #[error("Console Error: {message} {location}")]
    Console {
        message: String,
        location: ErrorLocation,
    },
}

impl From<IpcError> for PhantomError {
    #[track_caller]
    fn from(error: IpcError) -> Self {
        PhantomError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ConfigError> for PhantomError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        PhantomError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<LifecycleError> for PhantomError {
    #[track_caller]
    fn from(error: LifecycleError) -> Self {
        PhantomError::Core {
            message: error.user_message(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<RegistryError> for PhantomError {
    #[track_caller]
    fn from(error: RegistryError) -> Self {
        PhantomError::Core {
            message: error.user_message(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
