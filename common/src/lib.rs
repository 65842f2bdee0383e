//! Shared types for the Phantom client.
//!
//! This crate holds the small value types that every layer passes around:
//! the forwarder identity and the error location attached to every error.
//!
//! ## Architecture
//!
//! - **common** (this crate): Plain values, no behaviour
//! - **client-core**: State synchronization with the backend
//! - **phantom**: Console front-end wiring everything together

pub mod error;
pub mod listener_key;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use listener_key::ListenerKey;
