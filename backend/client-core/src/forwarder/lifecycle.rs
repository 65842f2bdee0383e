//! Forwarder Lifecycle Controller.
//!
//! One controller drives one listener. The backend is the only source of
//! truth for whether the forwarder runs: a command's success never flips the
//! state, only a `forwarder:Started` / `forwarder:Stopped` push-event carrying
//! this controller's key does.
//!
//! ```text
//!            toggle (stopped)                      forwarder:Started(key)
//! Stopped ---------------------> Starting* ---------------------------------> Started
//!    ^                                                                          |
//!    |  forwarder:Stopped(key)        confirm            toggle (started)       |
//!    +------------------------ stop <--------- confirm_pending <----------------+
//!                                                  |  cancel
//!                                                  +--------> Started
//!
//! * Starting is only displayed while the start command is in flight.
//! ```
//!
//! `loading` is set from the moment `toggle` is accepted until the command
//! returns (or the confirmation is cancelled); while it is set, `toggle` does
//! nothing.

use crate::broker::topics::{ForwarderStarted, ForwarderStopped};
use crate::broker::{EventBroker, Subscription};
use crate::error::lifecycle::LifecycleError;
use crate::forwarder::resolver::ForwarderResolver;
use crate::ipc::bridge::IpcBridge;
use crate::store::alert::{AlertLevel, AlertStore};

use common::{ErrorLocation, ListenerKey};

use std::fmt;
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ForwarderRuntimeState {
    #[default]
    Stopped,
    Starting,
    Started,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleAction {
    Start,
    Stop,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleAction::Start => write!(f, "start"),
            LifecycleAction::Stop => write!(f, "stop"),
        }
    }
}

/// Point-in-time view of one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForwarderSnapshot {
    pub state: ForwarderRuntimeState,
    pub loading: bool,
    pub confirm_pending: bool,
}

/// What a `toggle` or `confirm` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOutcome {
    /// Another action of this controller is in progress; nothing was done.
    Busy,
    /// The forwarder runs; stopping it waits for `confirm` or `cancel`.
    AwaitingConfirmation,
    /// `confirm` was called with no confirmation pending.
    NothingPending,
    /// The command was sent and acknowledged by the backend.
    Issued(LifecycleAction),
}

#[derive(Debug, Default)]
struct LifecycleState {
    started: bool,
    loading: bool,
    confirm_pending: bool,
    in_flight: Option<LifecycleAction>,
}

impl LifecycleState {
    fn snapshot(&self) -> ForwarderSnapshot {
        let state = if self.started {
            ForwarderRuntimeState::Started
        } else if self.in_flight == Some(LifecycleAction::Start) {
            ForwarderRuntimeState::Starting
        } else {
            ForwarderRuntimeState::Stopped
        };

        ForwarderSnapshot {
            state,
            loading: self.loading,
            confirm_pending: self.confirm_pending,
        }
    }
}

fn lock(state: &Mutex<LifecycleState>) -> MutexGuard<'_, LifecycleState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears `loading` when an action ends, however it ends.
struct InFlight<'a> {
    state: &'a Mutex<LifecycleState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.loading = false;
        state.in_flight = None;
    }
}

pub struct ForwarderController<B: IpcBridge> {
    key: ListenerKey,
    bridge: Arc<B>,
    resolver: ForwarderResolver<B>,
    broker: EventBroker,
    alerts: AlertStore,
    state: Arc<Mutex<LifecycleState>>,
    _started: Subscription,
    _stopped: Subscription,
}

impl<B: IpcBridge> ForwarderController<B> {
    /// Create a controller for `key` and subscribe it to the per-listener
    /// topics. The state starts as `Stopped` until an event or
    /// [`hydrate`](Self::hydrate) says otherwise.
    pub fn new(key: ListenerKey, bridge: Arc<B>, broker: EventBroker, alerts: AlertStore) -> Self {
        let state = Arc::new(Mutex::new(LifecycleState::default()));

        let started = {
            let key = key.clone();
            let state = Arc::clone(&state);
            broker.subscribe::<ForwarderStarted, _>(move |started| {
                if *started == key {
                    lock(&state).started = true;
                    debug!("Forwarder {key} started");
                }
            })
        };

        let stopped = {
            let key = key.clone();
            let state = Arc::clone(&state);
            broker.subscribe::<ForwarderStopped, _>(move |stopped| {
                if *stopped != key {
                    return;
                }

                let mut state = lock(&state);
                state.started = false;
                // Nothing left to confirm a stop for.
                if state.confirm_pending {
                    state.confirm_pending = false;
                    state.loading = false;
                }
                debug!("Forwarder {key} stopped");
            })
        };

        Self {
            resolver: ForwarderResolver::new(Arc::clone(&bridge)),
            key,
            bridge,
            broker,
            alerts,
            state,
            _started: started,
            _stopped: stopped,
        }
    }

    pub fn key(&self) -> &ListenerKey {
        &self.key
    }

    pub fn snapshot(&self) -> ForwarderSnapshot {
        lock(&self.state).snapshot()
    }

    /// Start a stopped forwarder, or ask for confirmation to stop a running
    /// one.
    ///
    /// # Errors
    ///
    /// Resolution and command failures are shown in the alert store and
    /// returned. `loading` is cleared either way.
    pub async fn toggle(&self) -> Result<LifecycleOutcome, LifecycleError> {
        {
            let mut state = lock(&self.state);
            if state.loading {
                debug!("Ignoring toggle of {}: action in progress", self.key);
                return Ok(LifecycleOutcome::Busy);
            }

            state.loading = true;

            if state.started {
                state.confirm_pending = true;
                info!("Stopping forwarder {} needs confirmation", self.key);
                return Ok(LifecycleOutcome::AwaitingConfirmation);
            }
        }

        self.run(LifecycleAction::Start).await
    }

    /// Proceed with a pending stop.
    pub async fn confirm(&self) -> Result<LifecycleOutcome, LifecycleError> {
        {
            let mut state = lock(&self.state);
            if !state.confirm_pending {
                return Ok(LifecycleOutcome::NothingPending);
            }
            state.confirm_pending = false;
        }

        self.run(LifecycleAction::Stop).await
    }

    /// Abandon a pending stop. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = lock(&self.state);
        if !state.confirm_pending {
            return false;
        }

        state.confirm_pending = false;
        state.loading = false;
        info!("Stop of forwarder {} cancelled", self.key);
        true
    }

    /// Ask the backend whether this forwarder runs and publish the answer,
    /// so every controller for the key converges.
    pub async fn hydrate(&self) -> Result<(), LifecycleError> {
        let started = self
            .bridge
            .forwarder_started(&self.key)
            .await
            .map_err(|source| LifecycleError::Query {
                message: format!("Failed to query status of forwarder {}", self.key),
                location: ErrorLocation::from(Location::caller()),
                source,
            })
            .inspect_err(|e| warn!("{e}"))?;

        if started {
            self.broker.publish::<ForwarderStarted>(self.key.clone());
        } else {
            self.broker.publish::<ForwarderStopped>(self.key.clone());
        }

        Ok(())
    }

    async fn run(&self, action: LifecycleAction) -> Result<LifecycleOutcome, LifecycleError> {
        let _in_flight = InFlight { state: &self.state };

        let index = self
            .resolver
            .resolve_index(&self.key)
            .await
            .inspect_err(|e| self.alerts.show(AlertLevel::Error, e.user_message()))?;

        lock(&self.state).in_flight = Some(action);
        info!("Requesting {action} of forwarder {} (index {index})", self.key);

        let result = match action {
            LifecycleAction::Start => self.bridge.start_forwarder(index).await,
            LifecycleAction::Stop => self.bridge.stop_forwarder(index).await,
        };

        result
            .map_err(|source| LifecycleError::Command {
                action,
                key: self.key.clone(),
                location: ErrorLocation::from(Location::caller()),
                source,
            })
            .inspect_err(|e| self.alerts.show(AlertLevel::Error, e.user_message()))?;

        Ok(LifecycleOutcome::Issued(action))
    }
}
