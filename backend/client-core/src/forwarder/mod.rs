//! Per-listener forwarder control.
//!
//! - [`ForwarderResolver`] maps a listen address to the backend's positional
//!   index, fresh for every action.
//! - [`ForwarderController`] runs the start/stop state machine for one
//!   listener and reconciles it with backend push-events.
//! - [`ForwarderRegistry`] adds, removes and relabels listeners.

pub mod lifecycle;
pub mod registry;
pub mod resolver;

pub use lifecycle::{
    ForwarderController, ForwarderRuntimeState, ForwarderSnapshot, LifecycleAction,
    LifecycleOutcome,
};
pub use registry::ForwarderRegistry;
pub use resolver::ForwarderResolver;
