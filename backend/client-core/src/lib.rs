//! Client-side state synchronization for the Phantom desktop client.
//!
//! The backend process owns the truth about the upstream connection and the
//! local forwarders. This crate keeps the client's view of that truth
//! consistent across the IPC boundary:
//!
//! - [`broker`] - typed in-process publish/subscribe bus
//! - [`ipc`] - request/response contract and the WebSocket transport
//! - [`store`] - connection, aggregate-forwarders and alert stores, and the
//!   [`Runtime`](store::Runtime) that routes push-events into them
//! - [`forwarder`] - per-listener lifecycle controller and address resolver
//! - [`config`] - client-side configuration file

pub mod broker;
pub mod config;
pub mod error;
pub mod forwarder;
pub mod ipc;
pub mod store;

#[cfg(test)]
mod tests;

pub const PHANTOM_IPC_HOSTNAME: &str = "127.0.0.1";
pub const PHANTOM_IPC_PORT: u16 = 19876;
pub const PHANTOM_IPC_DEFAULT_URL: &str =
    const_format::concatcp!("ws://", PHANTOM_IPC_HOSTNAME, ":", PHANTOM_IPC_PORT);
