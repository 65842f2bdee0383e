//! In-process typed publish/subscribe bus.
//!
//! The broker carries backend state changes from the stores to any number of
//! decoupled observers (status lines, per-forwarder controllers) so that none
//! of them needs direct access to the IPC channel.
//!
//! # Topics
//!
//! Topics are a closed set of zero-sized types implementing [`Topic`] (see
//! [`topics`]). Each one fixes its payload type, so a handler for
//! [`topics::ForwarderStarted`] always receives a [`ListenerKey`](common::ListenerKey)
//! and a handler for [`topics::ClientConnected`] receives `()`.
//!
//! # Delivery
//!
//! - `publish` runs every handler synchronously, in registration order.
//! - The handler list is snapshotted before dispatch, so handlers may
//!   subscribe or drop subscriptions while being called. A handler added during
//!   a dispatch is not called by that dispatch.
//! - Once `unsubscribe` (or dropping the [`Subscription`]) returns, no later
//!   `publish` reaches the handler.
//! - Publishing to a topic nobody listens to is a no-op.

pub mod topics;

pub use topics::Topic;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, trace};

type Handler<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Identifier of one registration, unique per broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    /// Always a `Handler<T::Payload>` for the topic it is filed under.
    handler: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct BrokerInner {
    next_id: AtomicU64,
    topics: Mutex<HashMap<TypeId, Vec<Registration>>>,
}

impl BrokerInner {
    fn registrations(&self) -> MutexGuard<'_, HashMap<TypeId, Vec<Registration>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, topic: TypeId, id: SubscriptionId) -> bool {
        let mut topics = self.registrations();
        let Some(registrations) = topics.get_mut(&topic) else {
            return false;
        };

        let before = registrations.len();
        registrations.retain(|registration| registration.id != id);
        let removed = registrations.len() != before;

        if registrations.is_empty() {
            topics.remove(&topic);
        }

        removed
    }
}

/// Shared handle to the event broker.
///
/// Cloning is cheap; all clones address the same set of subscriptions.
#[derive(Clone, Default)]
pub struct EventBroker {
    inner: Arc<BrokerInner>,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for topic `T`.
    ///
    /// The returned [`Subscription`] owns the registration: dropping it
    /// unsubscribes the handler.
    pub fn subscribe<T, F>(&self, handler: F) -> Subscription
    where
        T: Topic,
        F: Fn(&T::Payload) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler<T::Payload> = Arc::new(handler);

        self.inner
            .registrations()
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Registration {
                id,
                handler: Box::new(handler),
            });

        debug!("Subscribed handler {} to {}", id.0, T::NAME);

        Subscription {
            id,
            topic: TypeId::of::<T>(),
            topic_name: T::NAME,
            broker: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `payload` to every handler currently subscribed to `T`.
    pub fn publish<T: Topic>(&self, payload: T::Payload) {
        let handlers: Vec<Handler<T::Payload>> = self
            .inner
            .registrations()
            .get(&TypeId::of::<T>())
            .map(|registrations| {
                registrations
                    .iter()
                    .filter_map(|registration| {
                        registration
                            .handler
                            .downcast_ref::<Handler<T::Payload>>()
                            .cloned()
                    })
                    .collect()
            })
            .unwrap_or_default();

        if handlers.is_empty() {
            trace!("No subscribers for {}", T::NAME);
            return;
        }

        trace!("Publishing {} to {} handler(s)", T::NAME, handlers.len());

        for handler in handlers {
            handler(&payload);
        }
    }

    /// Release a subscription. Equivalent to dropping it.
    pub fn unsubscribe(&self, subscription: Subscription) {
        subscription.unsubscribe();
    }

    /// Number of handlers currently registered for `T`.
    pub fn subscriber_count<T: Topic>(&self) -> usize {
        self.inner
            .registrations()
            .get(&TypeId::of::<T>())
            .map_or(0, Vec::len)
    }
}

/// Registration of one handler on one topic.
///
/// The handler stays registered exactly as long as this value lives, so an
/// owner that stores its subscriptions as fields releases them on every exit
/// path, including panics and early returns.
#[must_use = "dropping a Subscription unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    topic: TypeId,
    topic_name: &'static str,
    broker: Weak<BrokerInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wire name of the topic this subscription listens to.
    pub fn topic_name(&self) -> &'static str {
        self.topic_name
    }

    /// Release the handler now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("topic", &self.topic_name)
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Broker already gone: nothing left to release.
        let Some(broker) = self.broker.upgrade() else {
            return;
        };

        if broker.remove(self.topic, self.id) {
            debug!("Unsubscribed handler {} from {}", self.id.0, self.topic_name);
        }
    }
}
