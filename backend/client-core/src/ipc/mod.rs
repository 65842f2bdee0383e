//! IPC (Inter-Process Communication) layer between the client and the backend.
//!
//! - [`IpcBridge`] - request/response contract the stores and controllers use
//! - [`protocol`] - wire types (commands, push-events, frames)
//! - [`WsBridge`] - JSON-over-WebSocket implementation of the contract
//!
//! # Push-events
//!
//! Push-events never travel through [`IpcBridge`] calls. The transport hands
//! out a [`PushEventStream`] when it connects; the caller feeds it into
//! [`Runtime::pump`](crate::store::Runtime::pump).

pub mod bridge;
pub mod protocol;
pub mod ws_bridge;

pub use bridge::{IpcBridge, PushEventStream};
pub use protocol::{
    EnvironmentInfo, ForwarderNode, IpcCommand, ListenerConfig, PhantomConfig, PushEvent,
};
pub use ws_bridge::WsBridge;
