//! WebSocket transport for [`IpcBridge`].
//!
//! One socket carries both directions of the IPC contract:
//!
//! - Requests are written as JSON text frames with a client-assigned id.
//! - A reader task routes `response` frames to the waiting caller by id and
//!   forwards `event` frames to the [`PushEventStream`] returned by
//!   [`WsBridge::connect`].
//! - A writer task owns the sink, so callers never contend for it.
//!
//! # Failure model
//!
//! - A request with no answer within the configured timeout fails with
//!   [`IpcError::Timeout`]; its late answer, if any, is dropped.
//! - When the socket closes, every pending and every later request fails with
//!   [`IpcError::Closed`] and the push-event stream ends.

use crate::error::ipc::IpcError;
use crate::ipc::bridge::{IpcBridge, PushEventStream};
use crate::ipc::protocol::{
    CLIENT_READY_SIGNAL, ClientMessage, EnvironmentInfo, ForwarderNode, IpcCommand,
    ListenerConfig, PhantomConfig, PushEvent, ServerMessage,
};

use common::{ErrorLocation, ListenerKey};

use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout as TokioTimeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

type Reply = Result<Value, IpcError>;

#[derive(Default)]
pub(crate) struct PendingRequests {
    waiters: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
}

impl PendingRequests {
    fn waiters(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<Reply>>> {
        self.waiters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, id: u64, waiter: oneshot::Sender<Reply>) {
        self.waiters().insert(id, waiter);
    }

    pub(crate) fn take(&self, id: u64) -> Option<oneshot::Sender<Reply>> {
        self.waiters().remove(&id)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.waiters().len()
    }

    pub(crate) fn fail_all(&self) {
        let waiters: Vec<_> = self.waiters().drain().collect();
        if !waiters.is_empty() {
            warn!("Failing {} pending IPC request(s): bridge closed", waiters.len());
        }
        for (_, waiter) in waiters {
            let _ = waiter.send(Err(IpcError::Closed {
                message: String::from("IPC bridge closed before the backend answered"),
                location: ErrorLocation::from(Location::caller()),
            }));
        }
    }
}

struct WsBridgeInner {
    outbound: mpsc::UnboundedSender<Message>,
    pending: Arc<PendingRequests>,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

/// [`IpcBridge`] over a WebSocket connection.
///
/// This type is `Clone`; all clones share one socket.
#[derive(Clone)]
pub struct WsBridge {
    inner: Arc<WsBridgeInner>,
}

impl WsBridge {
    /// Open the socket and start the reader/writer tasks.
    ///
    /// # Errors
    ///
    /// Returns [`IpcError::Connect`] if the URL is not a `ws://`/`wss://` URL
    /// or the WebSocket handshake fails.
    pub async fn connect(
        url: &str,
        request_timeout: Duration,
    ) -> Result<(Self, PushEventStream), IpcError> {
        let url = Url::parse(url).map_err(|e| IpcError::Connect {
            message: format!("Invalid IPC URL {url}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(IpcError::Connect {
                message: format!("IPC URL must use ws:// or wss://, got {url}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (stream, _) = connect_async(url.as_str()).await?;
        info!("Connected to backend at {url}");

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (events_tx, events_rx) = mpsc::unbounded_channel::<PushEvent>();

        let pending = Arc::new(PendingRequests::default());
        let closed = Arc::new(AtomicBool::new(false));

        TokioSpawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = sink.send(message).await {
                    error!("Failed to write IPC frame: {e}");
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("IPC writer stopped");
        });

        let reader_pending = Arc::clone(&pending);
        let reader_closed = Arc::clone(&closed);
        TokioSpawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        route_frame(text.as_str(), &reader_pending, &events_tx);
                    }
                    Ok(Message::Close(_)) => {
                        info!("Backend closed the IPC connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("IPC connection failed: {e}");
                        break;
                    }
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
            reader_pending.fail_all();
        });

        let bridge = Self {
            inner: Arc::new(WsBridgeInner {
                outbound: outbound_tx,
                pending,
                closed,
                next_id: AtomicU64::new(1),
                request_timeout,
            }),
        };

        Ok((bridge, events_rx))
    }

    /// Whether the socket has been closed by the backend or by an error.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    async fn request(&self, command: IpcCommand) -> Result<Value, IpcError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("IPC request {id}: {command:?}");
        let frame = serde_json::to_string(&ClientMessage::Request { id, command })?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.inner.pending.insert(id, reply_tx);

        // The reader marks the bridge closed before failing waiters, so a
        // waiter inserted after that sweep is caught here.
        if self.is_closed() {
            self.inner.pending.take(id);
            return Err(closed_error());
        }

        if self.inner.outbound.send(Message::Text(frame.into())).is_err() {
            self.inner.pending.take(id);
            return Err(closed_error());
        }

        match TokioTimeout(self.inner.request_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(closed_error()),
            Err(_) => {
                self.inner.pending.take(id);
                Err(IpcError::Timeout {
                    message: format!(
                        "Backend did not answer request {id} within {:?}",
                        self.inner.request_timeout
                    ),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    async fn request_as<T: DeserializeOwned>(&self, command: IpcCommand) -> Result<T, IpcError> {
        let value = self.request(command).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn request_unit(&self, command: IpcCommand) -> Result<(), IpcError> {
        self.request(command).await.map(|_| ())
    }
}

#[track_caller]
fn closed_error() -> IpcError {
    IpcError::Closed {
        message: String::from("IPC bridge is closed"),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Route one inbound text frame to its waiter or to the push-event stream.
pub(crate) fn route_frame(
    text: &str,
    pending: &PendingRequests,
    events: &mpsc::UnboundedSender<PushEvent>,
) {
    let message = match serde_json::from_str::<ServerMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Dropping undecodable IPC frame: {e}");
            return;
        }
    };

    match message {
        ServerMessage::Response { id, ok, error } => {
            let Some(waiter) = pending.take(id) else {
                warn!("Dropping response for unknown request {id}");
                return;
            };

            let reply = match error {
                Some(message) => Err(IpcError::Backend {
                    message,
                    location: ErrorLocation::from(Location::caller()),
                }),
                None => Ok(ok.unwrap_or(Value::Null)),
            };

            if waiter.send(reply).is_err() {
                debug!("Requester for {id} is gone");
            }
        }
        ServerMessage::Event(event) => {
            debug!("Push-event: {event:?}");
            if events.send(event).is_err() {
                debug!("Push-event stream dropped, discarding event");
            }
        }
    }
}

impl IpcBridge for WsBridge {
    async fn get_config(&self) -> Result<PhantomConfig, IpcError> {
        self.request_as(IpcCommand::GetConfig).await
    }

    async fn start_forwarder(&self, index: usize) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::StartForwarder(index)).await
    }

    async fn stop_forwarder(&self, index: usize) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::StopForwarder(index)).await
    }

    async fn all_forwarders_started(&self) -> Result<bool, IpcError> {
        self.request_as(IpcCommand::AllForwardersStarted).await
    }

    async fn forwarder_started(&self, key: &ListenerKey) -> Result<bool, IpcError> {
        self.request_as(IpcCommand::ForwarderStarted(key.clone()))
            .await
    }

    async fn connected_status(&self) -> Result<bool, IpcError> {
        self.request_as(IpcCommand::ConnectedStatus).await
    }

    async fn get_environment(&self) -> Result<EnvironmentInfo, IpcError> {
        self.request_as(IpcCommand::GetEnvironment).await
    }

    async fn start_client(&self) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::StartClient).await
    }

    async fn stop_client(&self) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::StopClient).await
    }

    async fn start_all_forwarders(&self) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::StartAllForwarders).await
    }

    async fn stop_all_forwarders(&self) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::StopAllForwarders).await
    }

    async fn add_forwarder(&self, listener: ListenerConfig) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::AddForwarder(listener)).await
    }

    async fn remove_forwarder(&self, index: usize) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::RemoveForwarder(index)).await
    }

    async fn update_forwarder_label(&self, index: usize, label: String) -> Result<(), IpcError> {
        self.request_unit(IpcCommand::UpdateForwarderLabel(index, label)).await
    }

    async fn connected_forwarder_nodes(&self) -> Result<Vec<ForwarderNode>, IpcError> {
        self.request_as(IpcCommand::GetConnectedForwarderNodes).await
    }

    fn signal_ready(&self) -> Result<(), IpcError> {
        let frame = serde_json::to_string(&ClientMessage::Signal {
            name: String::from(CLIENT_READY_SIGNAL),
        })?;

        self.inner
            .outbound
            .send(Message::Text(frame.into()))
            .map_err(|_| IpcError::Send {
                message: String::from("Cannot send ready signal: IPC bridge is closed"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("Sent {CLIENT_READY_SIGNAL} to backend");
        Ok(())
    }
}
