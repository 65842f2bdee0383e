//! Reactive stores mirroring backend state.
//!
//! Stores are cheap to clone; all clones share state. Every store mutates
//! under a short lock and publishes on the [`EventBroker`](crate::broker::EventBroker)
//! only after the lock is released, so broker handlers may read any store.

pub mod aggregate;
pub mod alert;
pub mod connection;
pub mod runtime;

pub use aggregate::{AggregateForwardersState, AggregateSignal, ForwardersStore};
pub use alert::{Alert, AlertLevel, AlertStore};
pub use connection::{ConnectionSignal, ConnectionState, ConnectionStore};
pub use runtime::Runtime;
