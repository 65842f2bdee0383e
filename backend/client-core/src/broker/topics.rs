//! The closed set of broker topics.
//!
//! Each topic mirrors one backend push-event; [`Topic::NAME`] is the event's
//! wire name.

use common::ListenerKey;

/// A broker topic with a fixed payload type.
pub trait Topic: Send + Sync + 'static {
    type Payload: Send + Sync + 'static;

    const NAME: &'static str;
}

/// The backend began connecting upstream.
pub struct ClientConnecting;

/// The backend's upstream connection is established.
pub struct ClientConnected;

/// The backend's upstream connection is gone.
pub struct ClientDisconnected;

/// One forwarder is now listening.
pub struct ForwarderStarted;

/// One forwarder stopped listening.
pub struct ForwarderStopped;

/// The backend is starting every configured forwarder.
pub struct ForwardersStarting;

/// Every configured forwarder is running.
pub struct ForwardersStarted;

/// No forwarder is running.
pub struct ForwardersStopped;

impl Topic for ClientConnecting {
    type Payload = ();
    const NAME: &'static str = "specter:Connecting";
}

impl Topic for ClientConnected {
    type Payload = ();
    const NAME: &'static str = "specter:Connected";
}

impl Topic for ClientDisconnected {
    type Payload = ();
    const NAME: &'static str = "specter:Disconnected";
}

impl Topic for ForwarderStarted {
    type Payload = ListenerKey;
    const NAME: &'static str = "forwarder:Started";
}

impl Topic for ForwarderStopped {
    type Payload = ListenerKey;
    const NAME: &'static str = "forwarder:Stopped";
}

impl Topic for ForwardersStarting {
    type Payload = ();
    const NAME: &'static str = "forwarders:Starting";
}

impl Topic for ForwardersStarted {
    type Payload = ();
    const NAME: &'static str = "forwarders:Started";
}

impl Topic for ForwardersStopped {
    type Payload = ();
    const NAME: &'static str = "forwarders:Stopped";
}
