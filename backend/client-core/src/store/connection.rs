//! Connection State Store.
//!
//! Mirrors the backend's upstream connection. The state moves only through
//! [`next_connection_state`]; push-events and the startup seed both go
//! through it, in arrival order.
//!
//! ```text
//! Disconnected --connecting--> Connecting --connected--> Connected
//!      ^                            |                        |
//!      +--------disconnected--------+-------disconnected-----+
//! ```

use crate::broker::EventBroker;
use crate::broker::topics::{ClientConnected, ClientConnecting, ClientDisconnected};
use crate::error::ipc::IpcError;
use crate::ipc::bridge::IpcBridge;

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Inbound connection push-event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSignal {
    Connecting,
    Connected,
    Disconnected,
}

/// Transition table. `None` means the signal is ignored in `current`.
pub(crate) fn next_connection_state(
    current: ConnectionState,
    signal: ConnectionSignal,
) -> Option<ConnectionState> {
    use ConnectionSignal as S;
    use ConnectionState as C;

    match (current, signal) {
        (C::Disconnected, S::Connecting) => Some(C::Connecting),
        (C::Connecting, S::Connected) => Some(C::Connected),
        (C::Connected | C::Connecting, S::Disconnected) => Some(C::Disconnected),
        _ => None,
    }
}

#[derive(Clone)]
pub struct ConnectionStore {
    state: Arc<RwLock<ConnectionState>>,
    broker: EventBroker,
}

impl ConnectionStore {
    pub fn new(broker: EventBroker) -> Self {
        Self {
            state: Arc::new(RwLock::new(ConnectionState::default())),
            broker,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reduce one signal. Returns whether the state changed.
    ///
    /// A change is published on the broker after the store is updated.
    pub fn apply(&self, signal: ConnectionSignal) -> bool {
        let next = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let Some(next) = next_connection_state(*state, signal) else {
                debug!("Ignoring {signal:?} while {:?}", *state);
                return false;
            };
            *state = next;
            next
        };

        info!("Connection state -> {next:?}");

        match next {
            ConnectionState::Connecting => self.broker.publish::<ClientConnecting>(()),
            ConnectionState::Connected => self.broker.publish::<ClientConnected>(()),
            ConnectionState::Disconnected => self.broker.publish::<ClientDisconnected>(()),
        }

        true
    }

    /// Reduce a `ConnectedStatus` answer.
    ///
    /// `true` goes through `Connecting` first so the store never jumps from
    /// `Disconnected` straight to `Connected`.
    pub fn apply_status(&self, connected: bool) {
        if connected {
            self.apply(ConnectionSignal::Connecting);
            self.apply(ConnectionSignal::Connected);
        } else {
            self.apply(ConnectionSignal::Disconnected);
        }
    }

    /// Query `ConnectedStatus` once and reduce the answer.
    pub async fn seed<B: IpcBridge>(&self, bridge: &B) -> Result<(), IpcError> {
        let connected = bridge.connected_status().await?;
        debug!("Seeded connection status: connected={connected}");
        self.apply_status(connected);
        Ok(())
    }
}
