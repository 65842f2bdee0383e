use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;
use tokio_tungstenite::tungstenite::Error as WsError;

#[derive(Debug, ThisError)]
pub enum IpcError {
    #[error("Connect Error: {message} {location}")]
    Connect {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },

    #[error("Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {message} {location}")]
    Timeout {
        message: String,
        location: ErrorLocation,
    },

    /// The backend answered the request with an error.
    #[error("Backend Error: {message} {location}")]
    Backend {
        message: String,
        location: ErrorLocation,
    },

    #[error("Protocol Error: {message} {location}")]
    Protocol {
        message: String,
        location: ErrorLocation,
    },
}

impl IpcError {
    /// Message without the location suffix, for user-facing alerts.
    pub fn message(&self) -> &str {
        match self {
            IpcError::Connect { message, .. }
            | IpcError::Send { message, .. }
            | IpcError::Closed { message, .. }
            | IpcError::Timeout { message, .. }
            | IpcError::Backend { message, .. }
            | IpcError::Protocol { message, .. } => message,
        }
    }
}

impl From<serde_json::Error> for IpcError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        IpcError::Protocol {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<WsError> for IpcError {
    #[track_caller]
    fn from(error: WsError) -> Self {
        IpcError::Connect {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
