//! Aggregate Forwarders State Store.
//!
//! Tracks the collection of forwarders as a whole. Only the
//! `forwarders:*` push-events reach it; per-listener events do not.

use crate::broker::EventBroker;
use crate::broker::topics::{ForwardersStarted, ForwardersStarting, ForwardersStopped};
use crate::error::ipc::IpcError;
use crate::ipc::bridge::IpcBridge;

use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateForwardersState {
    pub starting: bool,
    pub started: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateSignal {
    Starting,
    Started,
    Stopped,
}

impl AggregateForwardersState {
    pub(crate) fn reduce(self, signal: AggregateSignal) -> Self {
        match signal {
            AggregateSignal::Starting => Self {
                starting: true,
                ..self
            },
            AggregateSignal::Started => Self {
                starting: false,
                started: true,
            },
            AggregateSignal::Stopped => Self {
                starting: false,
                started: false,
            },
        }
    }
}

#[derive(Clone)]
pub struct ForwardersStore {
    state: Arc<RwLock<AggregateForwardersState>>,
    broker: EventBroker,
}

impl ForwardersStore {
    pub fn new(broker: EventBroker) -> Self {
        Self {
            state: Arc::new(RwLock::new(AggregateForwardersState::default())),
            broker,
        }
    }

    pub fn state(&self) -> AggregateForwardersState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reduce one signal. Returns whether the state changed; only a change
    /// is published.
    pub fn apply(&self, signal: AggregateSignal) -> bool {
        let next = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let next = state.reduce(signal);
            if next == *state {
                debug!("Aggregate forwarders unchanged by {signal:?}");
                return false;
            }
            *state = next;
            next
        };

        info!(
            "Aggregate forwarders -> starting={} started={}",
            next.starting, next.started
        );

        match signal {
            AggregateSignal::Starting => self.broker.publish::<ForwardersStarting>(()),
            AggregateSignal::Started => self.broker.publish::<ForwardersStarted>(()),
            AggregateSignal::Stopped => self.broker.publish::<ForwardersStopped>(()),
        }

        true
    }

    /// Query `AllForwardersStarted` and reduce the answer.
    ///
    /// `false` while a start is in progress leaves the store alone: the
    /// backend answers `false` until the last forwarder is up.
    pub async fn reload_status<B: IpcBridge>(&self, bridge: &B) -> Result<(), IpcError> {
        let started = bridge.all_forwarders_started().await?;
        debug!("All forwarders started: {started}");

        if started {
            self.apply(AggregateSignal::Started);
        } else if !self.state().starting {
            self.apply(AggregateSignal::Stopped);
        }

        Ok(())
    }
}
